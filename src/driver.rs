//! The Agent Driver: wires the tool catalog, hook pipeline, and subagent
//! roles into a runnable agent, independent of any concrete LLM wire client.
//!
//! `original_source`'s `TurboAgent` talks directly to the Claude Agent SDK
//! process transport. Here that dependency is abstracted behind
//! [`AgentRuntime`] so the driver's prompt-building, budget tracking, and
//! scope wiring can be exercised with [`NullAgentRuntime`] instead of a
//! real subprocess.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::audit::AuditLog;
use crate::error::{Error, Result};
use crate::hooks::HookPipeline;
use crate::http::HttpClient;
use crate::subagents::Role;
use crate::tools::{self, Tool};

/// A turn-by-turn event emitted while an agent run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Text(String),
    ToolCall { name: String, input: serde_json::Value },
    Result(RuntimeOutcome),
}

/// Summary of a completed run: the final text, cost, and turn count the
/// caller's 80%-of-budget warning is computed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeOutcome {
    pub text: String,
    pub total_cost_usd: f64,
    pub num_turns: u32,
    pub session_id: Option<String>,
}

/// A task for the agent to perform. Distinct from the system prompt, which
/// lives on [`RuntimeConfig`] and stays fixed across turns of a session.
#[derive(Debug, Clone)]
pub struct PromptInput {
    pub text: String,
}

impl From<&str> for PromptInput {
    fn from(text: &str) -> Self {
        PromptInput { text: text.to_string() }
    }
}

impl From<String> for PromptInput {
    fn from(text: String) -> Self {
        PromptInput { text }
    }
}

/// How the runtime should treat tool calls that would mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Write tools execute without an extra confirmation round-trip.
    AcceptEdits,
    /// Every write tool call requires runtime-specific approval first.
    RequireApproval,
}

/// Everything an [`AgentRuntime`] needs to execute one turn, a streamed
/// run, or a multi-turn session: model id, system prompt, the tool and
/// subagent catalogs, the hook pipeline, and the turn/cost ceilings.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub model: String,
    pub system_prompt: String,
    pub tools: Arc<Vec<Tool>>,
    pub subagent_roles: Arc<Vec<Role>>,
    pub hooks: Arc<HookPipeline>,
    pub max_turns: u32,
    pub max_budget_usd: f64,
    pub permission_mode: PermissionMode,
}

/// Abstraction over the concrete LLM wire client, so the driver's own
/// logic (prompt assembly, scope wiring, cost bookkeeping) can be tested
/// without a live subprocess or network connection.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run to completion and return the final outcome.
    async fn run_to_completion(
        &self,
        config: RuntimeConfig,
        prompt: PromptInput,
    ) -> Result<RuntimeOutcome>;

    /// Run, yielding events as they occur, ending with a `Result` event.
    async fn run_streaming(
        &self,
        config: RuntimeConfig,
        prompt: PromptInput,
    ) -> Result<BoxStream<'static, Result<RuntimeEvent>>>;

    /// Open a multi-turn session bound to this config's system prompt/model.
    async fn open_session(&self, config: RuntimeConfig) -> Result<Box<dyn RuntimeSession>>;
}

/// A multi-turn conversation handle returned by [`AgentRuntime::open_session`].
#[async_trait]
pub trait RuntimeSession: Send {
    async fn send(&mut self, message: &str) -> Result<String>;
    async fn close(&mut self) -> Result<()>;
}

/// Construction-time bounds and identity for a driver instance.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub project_id: Option<String>,
    pub model: String,
    pub max_turns: u32,
    pub max_budget_usd: f64,
}

impl DriverConfig {
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Self::with_bounds(model, 25, 2.0)
    }

    pub fn with_bounds(
        model: impl Into<String>,
        max_turns: u32,
        max_budget_usd: f64,
    ) -> Result<Self> {
        if max_turns < 1 {
            return Err(Error::config(format!(
                "max_turns must be >= 1, got {max_turns}"
            )));
        }
        if max_budget_usd <= 0.0 {
            return Err(Error::config(format!(
                "max_budget_usd must be > 0, got {max_budget_usd}"
            )));
        }
        Ok(DriverConfig {
            project_id: None,
            model: model.into(),
            max_turns,
            max_budget_usd,
        })
    }

    pub fn scoped_to(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// Autonomous project-management agent: the tool catalog, hook pipeline,
/// and subagent roster bound to one [`AgentRuntime`].
pub struct AgentDriver {
    config: DriverConfig,
    runtime: Box<dyn AgentRuntime>,
    http: Arc<HttpClient>,
    tools: Arc<Vec<Tool>>,
    hooks: Arc<HookPipeline>,
    subagent_roles: Arc<Vec<Role>>,
}

impl AgentDriver {
    pub fn new(config: DriverConfig, runtime: Box<dyn AgentRuntime>, http: Arc<HttpClient>) -> Self {
        let audit = Arc::new(AuditLog::from_env());
        let hooks = Arc::new(HookPipeline::new(audit, http.clone(), crate::config::rate_limit()));

        if let Some(project_id) = &config.project_id {
            crate::config::set_project_scope(project_id);
        }

        log::info!(
            "agent driver initialized (model={}, project={}, budget=${:.2})",
            config.model,
            config.project_id.as_deref().unwrap_or("all"),
            config.max_budget_usd
        );

        AgentDriver {
            config,
            runtime,
            tools: Arc::new(tools::catalog(http.clone())),
            http,
            hooks,
            subagent_roles: Arc::new(Role::ALL.to_vec()),
        }
    }

    /// Tool catalog available to the top-level agent (every tool, unlike a
    /// subagent role which sees a fixed subset).
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn hooks(&self) -> &Arc<HookPipeline> {
        &self.hooks
    }

    fn system_prompt(&self) -> String {
        let mut parts = vec![
            "You are Turbo Agent, an autonomous project management assistant.".to_string(),
            "You manage projects, issues, initiatives, and decisions using the Turbo platform."
                .to_string(),
            String::new(),
            "## Your tools".to_string(),
            "You have access to Turbo tools prefixed with mcp__turbo__.".to_string(),
            "Use these to read and manage project data.".to_string(),
            String::new(),
            "## Your subagents".to_string(),
            "You can delegate specialized tasks:".to_string(),
            "- triager: analyzes issues and recommends priorities (read-only)".to_string(),
            "- planner: breaks features into issues and records decisions".to_string(),
            "- reporter: generates status reports".to_string(),
            "- worker: manages work sessions (claim issues, log progress)".to_string(),
            String::new(),
            "## Guidelines".to_string(),
            "- Always check current state before making changes".to_string(),
            "- Be concise in responses; prefer bullet points over paragraphs".to_string(),
            "- When creating issues, include clear acceptance criteria".to_string(),
            "- Respect the work queue ordering unless told otherwise".to_string(),
            "- Log decisions and their rationale".to_string(),
        ];

        if let Some(project_id) = &self.config.project_id {
            parts.push(String::new());
            parts.push("## Scope".to_string());
            parts.push(format!("You are scoped to project ID: {project_id}"));
            parts.push("All operations are restricted to this project.".to_string());
        }

        parts.join("\n")
    }

    fn build_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            model: self.config.model.clone(),
            system_prompt: self.system_prompt(),
            tools: self.tools.clone(),
            subagent_roles: self.subagent_roles.clone(),
            hooks: self.hooks.clone(),
            max_turns: self.config.max_turns,
            max_budget_usd: self.config.max_budget_usd,
            permission_mode: PermissionMode::AcceptEdits,
        }
    }

    fn warn_if_over_budget(&self, total_cost_usd: f64) {
        warn_if_over_budget(self.config.max_budget_usd, total_cost_usd);
    }

    /// Execute a one-shot task and return the final result text.
    pub async fn run(&self, prompt: impl Into<PromptInput>) -> Result<RuntimeOutcome> {
        let prompt = prompt.into();
        log::info!("starting one-shot run: {}", truncate_for_log(&prompt.text));
        let outcome = self
            .runtime
            .run_to_completion(self.build_config(), prompt)
            .await?;
        self.warn_if_over_budget(outcome.total_cost_usd);
        log::info!(
            "run complete (cost=${:.4}, turns={})",
            outcome.total_cost_usd,
            outcome.num_turns
        );
        Ok(outcome)
    }

    /// Execute a task, yielding events as they occur. The terminal `Result`
    /// event is inspected for the same 80%-of-budget warning `run` emits.
    pub async fn stream(
        &self,
        prompt: impl Into<PromptInput>,
    ) -> Result<BoxStream<'static, Result<RuntimeEvent>>> {
        let prompt = prompt.into();
        log::info!("starting streaming run: {}", truncate_for_log(&prompt.text));
        let events = self.runtime.run_streaming(self.build_config(), prompt).await?;
        let max_budget_usd = self.config.max_budget_usd;
        let watched = events.inspect(move |event| {
            if let Ok(RuntimeEvent::Result(outcome)) = event {
                warn_if_over_budget(max_budget_usd, outcome.total_cost_usd);
            }
        });
        Ok(Box::pin(watched))
    }

    /// Open a multi-turn session. The returned handle owns the runtime's
    /// underlying conversation state until `close` is called.
    pub async fn session(&self) -> Result<Box<dyn RuntimeSession>> {
        log::info!("starting multi-turn session");
        self.runtime.open_session(self.build_config()).await
    }

    /// Tool names reachable by a given subagent role, namespaced for the
    /// runtime's function-calling interface.
    pub fn role_tool_names(&self, role: Role) -> Vec<String> {
        role.namespaced_tool_names()
    }

    /// Close the shared HTTP client, releasing its pooled connections.
    pub async fn close(&self) {
        log::info!("closing agent driver");
        self.http.close().await;
    }
}

fn warn_if_over_budget(max_budget_usd: f64, total_cost_usd: f64) {
    let warn_threshold = max_budget_usd * 0.8;
    if total_cost_usd > warn_threshold {
        log::warn!("cost ${total_cost_usd:.4} exceeds 80% of budget ${max_budget_usd:.2}");
    }
}

fn truncate_for_log(s: &str) -> String {
    if s.chars().count() > 100 {
        let head: String = s.chars().take(100).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Test double satisfying [`AgentRuntime`] without any process or network
/// I/O: returns a fixed outcome regardless of the config/prompt it receives.
pub struct NullAgentRuntime {
    pub fixed_outcome: RuntimeOutcome,
}

impl NullAgentRuntime {
    pub fn new(text: impl Into<String>) -> Self {
        NullAgentRuntime {
            fixed_outcome: RuntimeOutcome {
                text: text.into(),
                total_cost_usd: 0.0,
                num_turns: 1,
                session_id: None,
            },
        }
    }

    pub fn with_cost(mut self, total_cost_usd: f64) -> Self {
        self.fixed_outcome.total_cost_usd = total_cost_usd;
        self
    }
}

#[async_trait]
impl AgentRuntime for NullAgentRuntime {
    async fn run_to_completion(
        &self,
        _config: RuntimeConfig,
        _prompt: PromptInput,
    ) -> Result<RuntimeOutcome> {
        Ok(self.fixed_outcome.clone())
    }

    async fn run_streaming(
        &self,
        _config: RuntimeConfig,
        _prompt: PromptInput,
    ) -> Result<BoxStream<'static, Result<RuntimeEvent>>> {
        let outcome = self.fixed_outcome.clone();
        let events = vec![
            Ok(RuntimeEvent::Text(outcome.text.clone())),
            Ok(RuntimeEvent::Result(outcome)),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }

    async fn open_session(&self, _config: RuntimeConfig) -> Result<Box<dyn RuntimeSession>> {
        Ok(Box::new(NullRuntimeSession {
            reply: self.fixed_outcome.text.clone(),
        }))
    }
}

struct NullRuntimeSession {
    reply: String,
}

#[async_trait]
impl RuntimeSession for NullRuntimeSession {
    async fn send(&mut self, _message: &str) -> Result<String> {
        Ok(self.reply.clone())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn test_http() -> Arc<HttpClient> {
        Arc::new(HttpClient::new("http://127.0.0.1:1", None))
    }

    #[test]
    fn config_rejects_zero_max_turns() {
        assert!(DriverConfig::with_bounds("sonnet", 0, 1.0).is_err());
    }

    #[test]
    fn config_rejects_non_positive_budget() {
        assert!(DriverConfig::with_bounds("sonnet", 5, 0.0).is_err());
        assert!(DriverConfig::with_bounds("sonnet", 5, -1.0).is_err());
    }

    #[tokio::test]
    async fn run_returns_fixed_outcome_from_null_runtime() {
        let config = DriverConfig::new("sonnet").unwrap();
        let runtime = Box::new(NullAgentRuntime::new("done"));
        let driver = AgentDriver::new(config, runtime, test_http());

        let outcome = driver.run("do the thing").await.unwrap();
        assert_eq!(outcome.text, "done");
    }

    #[tokio::test]
    async fn scoped_driver_includes_scope_section_in_system_prompt() {
        let config = DriverConfig::new("sonnet").unwrap().scoped_to("P1");
        let runtime = Box::new(NullAgentRuntime::new("done"));
        let driver = AgentDriver::new(config, runtime, test_http());
        assert!(driver.system_prompt().contains("scoped to project ID: P1"));
    }

    #[tokio::test]
    async fn streaming_run_ends_with_result_event() {
        let config = DriverConfig::new("sonnet").unwrap();
        let runtime = Box::new(NullAgentRuntime::new("streamed"));
        let driver = AgentDriver::new(config, runtime, test_http());

        let mut events = driver.stream("go").await.unwrap();
        let mut last = None;
        while let Some(event) = events.next().await {
            last = Some(event.unwrap());
        }
        assert!(matches!(last, Some(RuntimeEvent::Result(_))));
    }

    #[tokio::test]
    async fn all_catalog_tools_are_namespaced_when_looked_up_by_role() {
        let config = DriverConfig::new("sonnet").unwrap();
        let runtime = Box::new(NullAgentRuntime::new("done"));
        let driver = AgentDriver::new(config, runtime, test_http());
        for role in Role::ALL {
            assert!(
                driver
                    .role_tool_names(role)
                    .iter()
                    .all(|n| n.starts_with(crate::hooks::TOOL_NAMESPACE))
            );
        }
    }

    #[tokio::test]
    async fn cost_over_budget_does_not_fail_the_run() {
        let config = DriverConfig::with_bounds("sonnet", 25, 1.0).unwrap();
        let runtime = Box::new(NullAgentRuntime::new("done").with_cost(5.0));
        let driver = AgentDriver::new(config, runtime, test_http());
        let outcome = driver.run("go").await.unwrap();
        assert_eq!(outcome.total_cost_usd, 5.0);
    }

    #[tokio::test]
    async fn streaming_over_budget_still_yields_the_real_outcome() {
        let config = DriverConfig::with_bounds("sonnet", 25, 1.0).unwrap();
        let runtime = Box::new(NullAgentRuntime::new("done").with_cost(5.0));
        let driver = AgentDriver::new(config, runtime, test_http());

        let mut events = driver.stream("go").await.unwrap();
        let mut last = None;
        while let Some(event) = events.next().await {
            last = Some(event.unwrap());
        }
        match last {
            Some(RuntimeEvent::Result(outcome)) => assert_eq!(outcome.total_cost_usd, 5.0),
            other => panic!("expected a Result event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_is_safe_to_call_and_idempotent() {
        let config = DriverConfig::new("sonnet").unwrap();
        let runtime = Box::new(NullAgentRuntime::new("done"));
        let driver = AgentDriver::new(config, runtime, test_http());
        driver.close().await;
        driver.close().await;
    }
}
