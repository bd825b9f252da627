//! Pooled, resilient HTTP client for the Turbo backing service.
//!
//! Mirrors `original_source`'s `TurboHTTPClient`: a single `reqwest::Client`
//! created lazily and reused, retry with exponential backoff on transient
//! failures, and a circuit breaker that fails fast once a backing service
//! looks persistently down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::retry::BackoffConfig;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_CIRCUIT_THRESHOLD: u32 = 5;
pub const DEFAULT_CIRCUIT_RECOVERY: Duration = Duration::from_secs(30);
const RETRYABLE_STATUS_CODES: [u16; 4] = [429, 502, 503, 504];

fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

#[derive(Debug, Default)]
struct CircuitState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Resilient, pooled HTTP client. One instance is normally held by the
/// [`crate::driver::AgentDriver`] for the lifetime of the process.
pub struct HttpClient {
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    circuit_threshold: u32,
    circuit_recovery: Duration,
    backoff: BackoffConfig,
    transport: Mutex<Option<reqwest::Client>>,
    circuit: Mutex<CircuitState>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            max_retries: DEFAULT_MAX_RETRIES,
            circuit_threshold: DEFAULT_CIRCUIT_THRESHOLD,
            circuit_recovery: DEFAULT_CIRCUIT_RECOVERY,
            backoff: BackoffConfig::default(),
            transport: Mutex::new(None),
            circuit: Mutex::new(CircuitState::default()),
        }
    }

    /// Build a client from the configuration surface's environment knobs.
    pub fn from_env() -> Self {
        Self::new(crate::config::api_url(), crate::config::api_key())
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_circuit_threshold(mut self, threshold: u32) -> Self {
        self.circuit_threshold = threshold;
        self
    }

    pub fn with_circuit_recovery(mut self, recovery: Duration) -> Self {
        self.circuit_recovery = recovery;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );
        if let Some(key) = &self.api_key {
            if let Ok(value) = format!("Bearer {key}").parse() {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get_transport(&self) -> Result<reqwest::Client> {
        let mut guard = self.transport.lock().await;
        if guard.is_none() {
            let client = reqwest::Client::builder()
                .default_headers(self.build_headers())
                .redirect(reqwest::redirect::Policy::limited(10))
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .pool_idle_timeout(Duration::from_secs(5))
                .build()
                .map_err(|e| Error::connectivity(format!("{}: {e}", self.base_url)))?;
            *guard = Some(client);
        }
        Ok(guard.as_ref().unwrap().clone())
    }

    async fn check_circuit(&self) -> Result<()> {
        let mut state = self.circuit.lock().await;
        if let Some(open_until) = state.open_until {
            let now = Instant::now();
            if now < open_until {
                let remaining = (open_until - now).as_secs();
                return Err(Error::circuit_open(remaining));
            }
            // Recovery window elapsed: half-open, allow one probe attempt.
            state.open_until = None;
            state.consecutive_failures = 0;
            log::info!("circuit breaker half-open, admitting probe request");
        }
        Ok(())
    }

    async fn record_success(&self) {
        let mut state = self.circuit.lock().await;
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    async fn record_failure(&self) {
        let mut state = self.circuit.lock().await;
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.circuit_threshold {
            state.open_until = Some(Instant::now() + self.circuit_recovery);
            log::warn!(
                "circuit breaker opened after {} consecutive failures, retrying in {:?}",
                state.consecutive_failures,
                self.circuit_recovery
            );
        }
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.check_circuit().await?;

        let normalized = ensure_trailing_slash(path);
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            normalized.trim_start_matches('/')
        );
        let method_name = method.as_str().to_string();
        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            let transport = self.get_transport().await?;
            let mut request = transport.request(method.clone(), &url);
            if let Some(params) = params {
                request = request.query(params);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        self.record_success().await;
                        let value = response.json::<Value>().await.unwrap_or(Value::Null);
                        return Ok(value);
                    }

                    let status_code = status.as_u16();
                    let body_text = response.text().await.unwrap_or_default();
                    let truncated: String = body_text.chars().take(500).collect();

                    if RETRYABLE_STATUS_CODES.contains(&status_code) && attempt < self.max_retries
                    {
                        self.record_failure().await;
                        log::warn!(
                            "retryable {status_code} on {method_name} {path} (attempt {}/{}, backoff {:?})",
                            attempt + 1,
                            self.max_retries + 1,
                            self.backoff.delay_for(attempt)
                        );
                        let delay = self.backoff.delay_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        last_error = Some(Error::from_http_status(
                            &method_name,
                            path,
                            status_code,
                            &truncated,
                        ));
                        continue;
                    }

                    self.record_failure().await;
                    return Err(Error::from_http_status(
                        &method_name,
                        path,
                        status_code,
                        &truncated,
                    ));
                }
                Err(err) if err.is_connect() => {
                    self.record_failure().await;
                    if attempt < self.max_retries {
                        log::warn!(
                            "connection error on {method_name} {path} (attempt {}/{}): {err}",
                            attempt + 1,
                            self.max_retries + 1
                        );
                        let delay = self.backoff.delay_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        last_error = Some(Error::connectivity(self.base_url.clone()));
                        continue;
                    }
                    return Err(Error::connectivity(self.base_url.clone()));
                }
                Err(err) if err.is_timeout() => {
                    self.record_failure().await;
                    if attempt < self.max_retries {
                        log::warn!(
                            "timeout on {method_name} {path} (attempt {}/{})",
                            attempt + 1,
                            self.max_retries + 1
                        );
                        let delay = self.backoff.delay_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        last_error = Some(Error::timeout(&method_name, path, attempt + 1));
                        continue;
                    }
                    return Err(Error::timeout(&method_name, path, self.max_retries + 1));
                }
                Err(err) => {
                    self.record_failure().await;
                    return Err(Error::connectivity(format!("{}: {err}", self.base_url)));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::unexpected(Some(format!(
                "request to {method_name} {path} failed after {} attempts with no recorded error",
                self.max_retries + 1
            )))
        }))
    }

    pub async fn get(&self, path: &str, params: Option<&[(String, String)]>) -> Result<Value> {
        self.request(reqwest::Method::GET, path, params, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(reqwest::Method::POST, path, None, Some(body))
            .await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(reqwest::Method::PATCH, path, None, Some(body))
            .await
    }

    /// Idempotent shutdown: safe to call when the transport was never
    /// created, and safe to call twice.
    pub async fn close(&self) {
        let mut guard = self.transport.lock().await;
        *guard = None;
    }
}

/// Module-level singleton, matching `original_source`'s `get_http_client`.
/// Owned by the [`crate::driver::AgentDriver`] in practice; exposed here so
/// tool handlers built without a driver (tests, the CLI) can share one
/// client instance.
static DEFAULT_CLIENT: Mutex<Option<Arc<HttpClient>>> = Mutex::const_new(None);

pub async fn get_http_client() -> Arc<HttpClient> {
    let mut guard = DEFAULT_CLIENT.lock().await;
    if guard.is_none() {
        *guard = Some(Arc::new(HttpClient::from_env()));
    }
    guard.as_ref().unwrap().clone()
}

pub async fn close_http_client() {
    let mut guard = DEFAULT_CLIENT.lock().await;
    if let Some(client) = guard.take() {
        client.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: String) -> HttpClient {
        HttpClient::new(base_url, None)
            .with_backoff(BackoffConfig {
                base_delay: Duration::ZERO,
                multiplier: 2.0,
                jitter_factor: 0.0,
            })
    }

    #[tokio::test]
    async fn path_without_trailing_slash_is_normalised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        let result = client.get("/projects", None).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn exhausted_retryable_status_raises_server_error_after_four_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        let err = client.get("/x", None).await.unwrap_err();
        assert!(matches!(err, Error::ServerError { status: 502, .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn retry_then_success_takes_exactly_three_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/issues/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "I1"})))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        let result = client
            .post("/issues", &serde_json::json!({"title": "x"}))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"id": "I1"}));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues/missing/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        let err = client.get("/issues/missing", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn circuit_opens_after_threshold_and_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client_for(server.uri())
            .with_circuit_threshold(2)
            .with_circuit_recovery(Duration::from_millis(20));

        // Two non-retryable failures open the circuit.
        assert!(client.get("/flaky", None).await.is_err());
        assert!(client.get("/flaky", None).await.is_err());

        let err = client.get("/flaky", None).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));

        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = client.get("/flaky", None).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_safe_before_first_use() {
        let client = HttpClient::new("http://localhost:1", None);
        client.close().await;
        client.close().await;
    }

    #[tokio::test]
    async fn singleton_returns_same_instance_until_closed() {
        close_http_client().await;
        let a = get_http_client().await;
        let b = get_http_client().await;
        assert!(Arc::ptr_eq(&a, &b));
        close_http_client().await;
    }
}
