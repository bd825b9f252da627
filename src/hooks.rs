//! The ordered hook pipeline: audit, rate limit, project-scope enforcement,
//! and the destructive-shell filter, evaluated before every tool call; a
//! single audit hook runs after.
//!
//! `original_source` models this chain as coroutines returning a sentinel
//! with "first non-None wins" semantics; here the chain is a typed
//! [`Decision`] fold that short-circuits on the first [`Decision::Deny`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::audit::AuditLog;
use crate::error::Result;
use crate::http::HttpClient;

/// The tool-server namespace every backing-service tool name is prefixed with.
pub const TOOL_NAMESPACE: &str = "mcp__turbo__";

/// Name of the LLM runtime's built-in shell-execution tool. Not part of the
/// Turbo tool catalog; the destructive-shell filter matches it by name
/// alone so a raw shell escape hatch still gets screened.
pub const SHELL_TOOL_NAME: &str = "Bash";

const CROSS_PROJECT_TOOLS: &[&str] = &[
    "list_projects",
    "list_issues",
    "list_initiatives",
    "list_decisions",
    "get_work_queue",
    "get_next_issue",
];

const DIRECT_PROJECT_TOOLS: &[&str] = &[
    "get_project",
    "get_project_issues",
    "create_issue",
    "project_status_summary",
];

const ISSUE_SCOPED_TOOLS: &[&str] = &["get_issue", "update_issue", "start_issue_work", "log_work"];

const DESTRUCTIVE_PATTERNS: &[&str] = &[
    "rm -rf",
    "rm -r -f",
    "git push --force",
    "git push -f",
    "git reset --hard",
    "drop table",
    "drop database",
    "delete from",
    "truncate table",
    "git branch -d main",
    "chmod -r 777",
    "chmod 777",
    ":(){ :|:& };:",
];

/// Outcome of a single gate in the pre-call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Deny { reason: String },
}

impl Decision {
    pub fn is_deny(&self) -> bool {
        matches!(self, Decision::Deny { .. })
    }
}

/// Sliding 60-second window of admission timestamps, one per tool name.
pub struct RateLimiter {
    limit: u32,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Prune the window, then admit the call if it stays under the limit.
    pub fn check_and_record(&self, tool: &str) -> Option<String> {
        let mut windows = self.windows.lock().unwrap();
        let now = Instant::now();
        let window = windows.entry(tool.to_string()).or_default();
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= Duration::from_secs(60) {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() as u32 >= self.limit {
            return Some(format!(
                "Rate limit exceeded for tool '{tool}': {} calls in the last 60s (limit {}).",
                window.len(),
                self.limit
            ));
        }

        window.push_back(now);
        None
    }

    /// Test hook: restore initial (empty) state.
    pub fn reset(&self) {
        self.windows.lock().unwrap().clear();
    }
}

/// Resolves an issue id to its owning project id, consulting (and
/// populating) a process-lifetime cache before falling back to the backing
/// service.
pub struct ScopeEnforcer {
    http: Arc<HttpClient>,
    issue_project_cache: DashMap<String, String>,
}

impl ScopeEnforcer {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            issue_project_cache: DashMap::new(),
        }
    }

    /// Evaluate the scope gate for a backing-service tool call. Returns
    /// `Some(reason)` to deny, `None` to continue.
    pub async fn check(&self, bare_tool_name: &str, input: &Value) -> Option<String> {
        let allow_list = crate::config::allowed_project_ids();
        if allow_list.is_empty() {
            return None;
        }

        if CROSS_PROJECT_TOOLS.contains(&bare_tool_name) {
            if let Some(project_id) = input.get("project_id").and_then(Value::as_str) {
                if !allow_list.iter().any(|p| p == project_id) {
                    return Some(out_of_scope_reason(project_id, &allow_list));
                }
            }
            return None;
        }

        if DIRECT_PROJECT_TOOLS.contains(&bare_tool_name) {
            match input.get("project_id").and_then(Value::as_str) {
                Some(project_id) if allow_list.iter().any(|p| p == project_id) => return None,
                Some(project_id) => return Some(out_of_scope_reason(project_id, &allow_list)),
                // No project_id carried: fall through to the issue-scoped
                // check below, then to the final pass-through.
                None => {}
            }
        }

        if ISSUE_SCOPED_TOOLS.contains(&bare_tool_name) {
            let Some(issue_id) = input.get("issue_id").and_then(Value::as_str) else {
                return Some(
                    "Safety check failed: missing issue_id, cannot resolve project scope."
                        .to_string(),
                );
            };

            let project_id = if let Some(cached) = self.issue_project_cache.get(issue_id) {
                cached.clone()
            } else {
                match self.resolve_issue_project(issue_id).await {
                    Ok(project_id) => {
                        self.issue_project_cache
                            .insert(issue_id.to_string(), project_id.clone());
                        project_id
                    }
                    Err(e) => {
                        return Some(format!(
                            "Safety check failed: could not resolve project for issue '{issue_id}': {e}"
                        ));
                    }
                }
            };

            if allow_list.iter().any(|p| p == &project_id) {
                return None;
            }
            return Some(out_of_scope_reason(&project_id, &allow_list));
        }

        // Any other tool: the hook cannot confirm a project boundary and
        // must not manufacture one.
        None
    }

    async fn resolve_issue_project(&self, issue_id: &str) -> Result<String> {
        let path = format!("/issues/{issue_id}");
        let body = self.http.get(&path, None).await?;
        body.get("project_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                crate::error::Error::unexpected(Some(format!(
                    "issue '{issue_id}' response did not include project_id"
                )))
            })
    }

    /// Test hook: restore initial (empty) state.
    pub fn clear_cache(&self) {
        self.issue_project_cache.clear();
    }
}

fn out_of_scope_reason(project_id: &str, allow_list: &[String]) -> String {
    format!("Project '{project_id}' is not in the allowed project scope {allow_list:?}.")
}

/// Case-insensitive substring match against the destructive-command list.
/// Returns the matched pattern (for the deny reason) if the shell command
/// is dangerous.
pub fn find_destructive_pattern(command: &str) -> Option<&'static str> {
    let lowered = command.to_lowercase();
    DESTRUCTIVE_PATTERNS
        .iter()
        .find(|pattern| lowered.contains(*pattern))
        .copied()
}

/// The full pre-call/post-call gate chain, owning the shared audit log,
/// rate limiter, and scope enforcer.
pub struct HookPipeline {
    audit: Arc<AuditLog>,
    rate_limiter: RateLimiter,
    scope: ScopeEnforcer,
}

impl HookPipeline {
    pub fn new(audit: Arc<AuditLog>, http: Arc<HttpClient>, rate_limit: u32) -> Self {
        Self {
            audit,
            rate_limiter: RateLimiter::new(rate_limit),
            scope: ScopeEnforcer::new(http),
        }
    }

    /// Run the ordered pre-call chain: audit (always), rate limit, project
    /// scope (backing-service tools only), destructive-shell filter (shell
    /// tool only). The audit entry is appended regardless of outcome.
    pub async fn pre_call(&self, tool_use_id: &str, tool_name: &str, input: &Value) -> Decision {
        self.audit.log_tool_call(tool_name, tool_use_id, input);

        if let Some(reason) = self.rate_limiter.check_and_record(tool_name) {
            return Decision::Deny { reason };
        }

        if let Some(bare) = tool_name.strip_prefix(TOOL_NAMESPACE) {
            if let Some(reason) = self.scope.check(bare, input).await {
                return Decision::Deny { reason };
            }
        }

        if tool_name == SHELL_TOOL_NAME {
            if let Some(command) = input.get("command").and_then(Value::as_str) {
                if let Some(pattern) = find_destructive_pattern(command) {
                    return Decision::Deny {
                        reason: crate::error::Error::destructive_blocked(pattern).agent_message(),
                    };
                }
            }
        }

        Decision::Continue
    }

    /// Post-call audit hook: records the outcome of an already-executed call.
    pub fn post_call(&self, tool_use_id: &str, tool_name: &str, is_error: bool) {
        self.audit.log_tool_result(tool_name, tool_use_id, is_error);
    }

    /// Test hook.
    pub fn reset_rate_limiter(&self) {
        self.rate_limiter.reset();
    }

    /// Test hook.
    pub fn clear_issue_project_cache(&self) {
        self.scope.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::http::HttpClient;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    static ENV_LOCK: StdMutex<()> = StdMutex::new(());

    fn pipeline(base_url: String) -> HookPipeline {
        let dir = tempdir().unwrap();
        let audit = Arc::new(AuditLog::new(dir.path().join("audit.jsonl")));
        let http = Arc::new(HttpClient::new(base_url, None));
        HookPipeline::new(audit, http, 30)
    }

    fn set_allow_list(ids: &str) {
        unsafe {
            std::env::set_var("TURBO_ALLOWED_PROJECT_IDS", ids);
        }
    }

    fn clear_allow_list() {
        unsafe {
            std::env::remove_var("TURBO_ALLOWED_PROJECT_IDS");
        }
    }

    #[tokio::test]
    async fn scope_deny_direct_project_mismatch() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_allow_list("A");
        let p = pipeline("http://localhost:1".to_string());

        let decision = p
            .pre_call(
                "tu_1",
                "mcp__turbo__get_project",
                &json!({"project_id": "B"}),
            )
            .await;

        match decision {
            Decision::Deny { reason } => assert!(reason.contains('B')),
            Decision::Continue => panic!("expected deny"),
        }
        clear_allow_list();
    }

    #[tokio::test]
    async fn scope_allows_cross_project_read_with_empty_args() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_allow_list("A");
        let p = pipeline("http://localhost:1".to_string());

        let decision = p
            .pre_call("tu_1", "mcp__turbo__list_projects", &json!({}))
            .await;
        assert_eq!(decision, Decision::Continue);
        clear_allow_list();
    }

    #[tokio::test]
    async fn scope_issue_resolution_uses_warm_cache_without_network() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_allow_list("A");
        // Base URL intentionally unroutable: a warm cache must avoid the network entirely.
        let p = pipeline("http://127.0.0.1:1".to_string());
        p.scope
            .issue_project_cache
            .insert("I1".to_string(), "A".to_string());

        let decision = p
            .pre_call(
                "tu_1",
                "mcp__turbo__get_issue",
                &json!({"issue_id": "I1"}),
            )
            .await;
        assert_eq!(decision, Decision::Continue);
        clear_allow_list();
    }

    #[tokio::test]
    async fn scope_issue_resolution_failure_denies_fail_closed() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_allow_list("A");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues/I9/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let p = pipeline(server.uri());

        let decision = p
            .pre_call(
                "tu_1",
                "mcp__turbo__update_issue",
                &json!({"issue_id": "I9", "status": "open"}),
            )
            .await;

        match decision {
            Decision::Deny { reason } => assert!(reason.to_lowercase().contains("safety")),
            Decision::Continue => panic!("expected deny"),
        }
        clear_allow_list();
    }

    #[test]
    fn rate_limit_denies_the_sixth_call_within_a_minute() {
        let limited = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(limited.check_and_record("list_projects").is_none());
        }
        let reason = limited.check_and_record("list_projects");
        assert!(reason.unwrap().contains("Rate limit"));
    }

    #[tokio::test]
    async fn destructive_shell_command_is_blocked() {
        let p = pipeline("http://localhost:1".to_string());
        let decision = p
            .pre_call("tu_1", SHELL_TOOL_NAME, &json!({"command": "RM -RF /tmp/x"}))
            .await;
        match decision {
            Decision::Deny { reason } => assert!(reason.contains("rm -rf")),
            Decision::Continue => panic!("expected deny"),
        }
    }

    #[test]
    fn canonical_hash_invariant_holds_via_audit_module() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(crate::audit::input_hash(&a), crate::audit::input_hash(&b));
    }
}
