//! # Turbo Agent Core
//!
//! The agent-runtime control plane for Turbo: a resilient HTTP client, a
//! fixed tool catalog backed by the Turbo API, a hook pipeline enforcing
//! project scope and shell safety, named subagent roles, and a cost/turn
//! bounded driver that runs against any [`driver::AgentRuntime`]
//! implementation.
//!
//! ## Architecture
//!
//! - **config**: environment-driven configuration surface
//! - **error**: the `Error` enum and `Result` alias used throughout
//! - **retry**: exponential backoff with jitter for the HTTP client
//! - **domain**: validated value objects and backing-service entity shapes
//! - **http**: pooled, retrying, circuit-breaking HTTP client
//! - **audit**: rotating JSONL audit log for tool invocations
//! - **hooks**: the pre/post-call hook pipeline (audit, rate limit, scope, shell safety)
//! - **tools**: the sixteen-tool catalog exposed to the agent
//! - **subagents**: named roles with fixed tool subsets and model tiers
//! - **driver**: the `AgentDriver` and the `AgentRuntime` adapter trait

pub mod audit;
pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod http;
pub mod retry;
pub mod subagents;
pub mod tools;

pub use driver::{AgentDriver, AgentRuntime, DriverConfig, RuntimeConfig, RuntimeEvent, RuntimeOutcome};
pub use error::{Error, Result};
pub use hooks::{Decision, HookPipeline};
pub use http::HttpClient;
pub use subagents::Role;
pub use tools::{Tool, ToolBuilder, ToolResult, tool};

/// Convenience module with the most commonly used types.
pub mod prelude {
    pub use crate::{
        AgentDriver, DriverConfig, Error, HookPipeline, HttpClient, Result, Role, RuntimeEvent,
        RuntimeOutcome, Tool, ToolResult, tool,
    };
}
