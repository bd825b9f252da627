//! Error taxonomy for the Turbo agent-runtime control plane.
//!
//! Every variant renders the exact agent-facing message an LLM tool result
//! should surface — callers never reformat these strings, they forward
//! `Display`/[`Error::agent_message`] straight into the tool result envelope.

use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error covering every failure mode a tool handler can hit.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Input failed schema/value validation before any network I/O occurred.
    #[error("Invalid input: {details}. Check the tool's parameter descriptions and try again.")]
    Validation { details: String },

    /// Backing service reported 404.
    #[error("Error: {method} {path} not found (404). Try: Use a list tool to find valid IDs.")]
    NotFound { method: String, path: String },

    /// Backing service reported 422.
    #[error(
        "Error: Invalid input for {method} {path} (422). Details: {body}. Try: Check required fields and value formats."
    )]
    InvalidRequest {
        method: String,
        path: String,
        body: String,
    },

    /// Backing service reported 409.
    #[error(
        "Error: Conflict on {method} {path} (409). Details: {body}. Try: Check current state before retrying."
    )]
    Conflict {
        method: String,
        path: String,
        body: String,
    },

    /// Backing service reported >= 500 after retries were exhausted.
    #[error("Error: Turbo API server error on {method} {path} ({status}). Try: Wait a moment and retry.")]
    ServerError {
        method: String,
        path: String,
        status: u16,
    },

    /// Any other unclassified HTTP failure.
    #[error("Error: {method} {path} returned {status}. Details: {body}")]
    OtherHttp {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// Connect error or DNS failure after retries were exhausted.
    #[error("Cannot connect to Turbo API at {base_url}")]
    Connectivity { base_url: String },

    /// Read/write timeout after retries were exhausted.
    #[error("Timeout on {method} {path} after {attempts} attempts")]
    Timeout {
        method: String,
        path: String,
        attempts: u32,
    },

    /// Short-circuited by the circuit breaker; no network I/O attempted.
    #[error("Circuit breaker open. API calls paused for {remaining_secs}s.")]
    CircuitOpen { remaining_secs: u64 },

    /// A pre-call hook gate denied the invocation.
    #[error("{reason}")]
    DeniedByHook { reason: String },

    /// The destructive-shell filter matched a dangerous pattern.
    #[error(
        "Destructive command blocked: contains '{pattern}'. Turbo agents cannot execute destructive shell commands."
    )]
    DestructiveBlocked { pattern: String },

    /// Handler raised a condition that doesn't fit any other kind.
    #[error("Error: Unexpected failure.{hint}")]
    Unexpected { hint: String },

    /// Configuration is malformed (construction-time bound checks, etc).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON (de)serialization failure, surfaced ambiently from serde.
    #[error("JSON error: {0}")]
    Json(String),
}

impl Error {
    pub fn validation(details: impl Into<String>) -> Self {
        Error::Validation {
            details: details.into(),
        }
    }

    pub fn not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Error::NotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn invalid_request(
        method: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Error::InvalidRequest {
            method: method.into(),
            path: path.into(),
            body: body.into(),
        }
    }

    pub fn conflict(
        method: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Error::Conflict {
            method: method.into(),
            path: path.into(),
            body: body.into(),
        }
    }

    pub fn server_error(method: impl Into<String>, path: impl Into<String>, status: u16) -> Self {
        Error::ServerError {
            method: method.into(),
            path: path.into(),
            status,
        }
    }

    pub fn other_http(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Error::OtherHttp {
            method: method.into(),
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    pub fn connectivity(base_url: impl Into<String>) -> Self {
        Error::Connectivity {
            base_url: base_url.into(),
        }
    }

    pub fn timeout(method: impl Into<String>, path: impl Into<String>, attempts: u32) -> Self {
        Error::Timeout {
            method: method.into(),
            path: path.into(),
            attempts,
        }
    }

    pub fn circuit_open(remaining_secs: u64) -> Self {
        Error::CircuitOpen { remaining_secs }
    }

    pub fn denied_by_hook(reason: impl Into<String>) -> Self {
        Error::DeniedByHook {
            reason: reason.into(),
        }
    }

    pub fn destructive_blocked(pattern: impl Into<String>) -> Self {
        Error::DestructiveBlocked {
            pattern: pattern.into(),
        }
    }

    pub fn unexpected(hint: Option<impl Into<String>>) -> Self {
        Error::Unexpected {
            hint: hint.map(|h| format!(" {}", h.into())).unwrap_or_default(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Map an HTTP status code plus its body to the matching non-retryable
    /// error kind. Callers are expected to have already exhausted retries
    /// for retryable statuses before reaching this classification.
    pub fn from_http_status(method: &str, path: &str, status: u16, body: &str) -> Self {
        match status {
            404 => Error::not_found(method, path),
            422 => Error::invalid_request(method, path, body),
            409 => Error::conflict(method, path, body),
            s if s >= 500 => Error::server_error(method, path, s),
            s => Error::other_http(method, path, s, body),
        }
    }

    /// The exact text a tool result envelope should surface to the agent.
    pub fn agent_message(&self) -> String {
        self.to_string()
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_matches_template() {
        let err = Error::validation("title must be 1..500 chars");
        assert_eq!(
            err.agent_message(),
            "Invalid input: title must be 1..500 chars. Check the tool's parameter descriptions and try again."
        );
    }

    #[test]
    fn not_found_message_matches_template() {
        let err = Error::not_found("GET", "/issues/XYZ");
        assert_eq!(
            err.agent_message(),
            "Error: GET /issues/XYZ not found (404). Try: Use a list tool to find valid IDs."
        );
    }

    #[test]
    fn invalid_request_message_matches_template() {
        let err = Error::invalid_request("POST", "/issues", "{\"title\":[\"required\"]}");
        assert_eq!(
            err.agent_message(),
            "Error: Invalid input for POST /issues (422). Details: {\"title\":[\"required\"]}. Try: Check required fields and value formats."
        );
    }

    #[test]
    fn conflict_message_matches_template() {
        let err = Error::conflict("PATCH", "/issues/1", "already closed");
        assert_eq!(
            err.agent_message(),
            "Error: Conflict on PATCH /issues/1 (409). Details: already closed. Try: Check current state before retrying."
        );
    }

    #[test]
    fn server_error_message_matches_template() {
        let err = Error::server_error("GET", "/projects", 503);
        assert_eq!(
            err.agent_message(),
            "Error: Turbo API server error on GET /projects (503). Try: Wait a moment and retry."
        );
    }

    #[test]
    fn other_http_message_matches_template() {
        let err = Error::other_http("GET", "/projects", 418, "teapot");
        assert_eq!(
            err.agent_message(),
            "Error: GET /projects returned 418. Details: teapot"
        );
    }

    #[test]
    fn connectivity_message_matches_template() {
        let err = Error::connectivity("http://localhost:8001/api/v1");
        assert_eq!(
            err.agent_message(),
            "Cannot connect to Turbo API at http://localhost:8001/api/v1"
        );
    }

    #[test]
    fn timeout_message_matches_template() {
        let err = Error::timeout("GET", "/projects", 4);
        assert_eq!(
            err.agent_message(),
            "Timeout on GET /projects after 4 attempts"
        );
    }

    #[test]
    fn circuit_open_message_matches_template() {
        let err = Error::circuit_open(12);
        assert_eq!(
            err.agent_message(),
            "Circuit breaker open. API calls paused for 12s."
        );
    }

    #[test]
    fn destructive_blocked_message_matches_template() {
        let err = Error::destructive_blocked("rm -rf");
        assert_eq!(
            err.agent_message(),
            "Destructive command blocked: contains 'rm -rf'. Turbo agents cannot execute destructive shell commands."
        );
    }

    #[test]
    fn unexpected_message_with_and_without_hint() {
        let err = Error::unexpected::<String>(None);
        assert_eq!(err.agent_message(), "Error: Unexpected failure.");

        let err = Error::unexpected(Some("check logs"));
        assert_eq!(err.agent_message(), "Error: Unexpected failure. check logs");
    }

    #[test]
    fn from_http_status_maps_known_codes() {
        assert!(matches!(
            Error::from_http_status("GET", "/x", 404, ""),
            Error::NotFound { .. }
        ));
        assert!(matches!(
            Error::from_http_status("GET", "/x", 422, ""),
            Error::InvalidRequest { .. }
        ));
        assert!(matches!(
            Error::from_http_status("GET", "/x", 409, ""),
            Error::Conflict { .. }
        ));
        assert!(matches!(
            Error::from_http_status("GET", "/x", 500, ""),
            Error::ServerError { .. }
        ));
        assert!(matches!(
            Error::from_http_status("GET", "/x", 418, ""),
            Error::OtherHttp { .. }
        ));
    }
}
