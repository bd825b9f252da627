//! Environment-driven configuration surface.
//!
//! Every knob here is read fresh from `std::env` at the call site rather
//! than cached at process start, matching the spec's requirement that the
//! scope enforcer observe `TURBO_ALLOWED_PROJECT_IDS` changes made mid-run
//! by tests.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8001/api/v1";
pub const DEFAULT_RATE_LIMIT: u32 = 30;
pub const DEFAULT_SMART_MODEL: &str = "sonnet";
pub const DEFAULT_FAST_MODEL: &str = "haiku";

/// Base URL of the backing service, e.g. `http://localhost:8001/api/v1`.
pub fn api_url() -> String {
    env::var("TURBO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Bearer token for the backing service, if configured.
pub fn api_key() -> Option<String> {
    env::var("TURBO_API_KEY").ok().filter(|s| !s.is_empty())
}

/// Comma-separated project allow-list. Empty/unset disables scope
/// enforcement entirely (an empty `Vec` signals "no enforcement").
pub fn allowed_project_ids() -> Vec<String> {
    env::var("TURBO_ALLOWED_PROJECT_IDS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Ceiling for the 60-second sliding rate-limit window, per tool name.
pub fn rate_limit() -> u32 {
    env::var("TURBO_AGENT_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT)
}

/// Path to the rotating audit log, defaulting to `~/.turbo/agent-audit.jsonl`.
pub fn audit_log_path() -> PathBuf {
    env::var("TURBO_AGENT_AUDIT_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".turbo")
                .join("agent-audit.jsonl")
        })
}

/// Model tier used for reasoning-heavy subagents (triager, planner, worker).
pub fn smart_model() -> String {
    env::var("TURBO_AGENT_SMART_MODEL").unwrap_or_else(|_| DEFAULT_SMART_MODEL.to_string())
}

/// Model tier used for fast-summarisation subagents (reporter).
pub fn fast_model() -> String {
    env::var("TURBO_AGENT_FAST_MODEL").unwrap_or_else(|_| DEFAULT_FAST_MODEL.to_string())
}

/// Set the allow-list environment variable to a single project id.
///
/// Used by the Agent Driver at construction time when a caller scopes the
/// agent to one project; this is a thin wrapper so the intent reads clearly
/// at the call site.
pub fn set_project_scope(project_id: &str) {
    // SAFETY: this runs once at driver construction, before any tool call
    // can race on the same variable.
    unsafe {
        env::set_var("TURBO_ALLOWED_PROJECT_IDS", project_id);
    }
}
