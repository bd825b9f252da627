//! Exponential backoff calculation, shared by the resilient HTTP client.
//!
//! This is deliberately a pure calculator rather than a generic
//! `retry_with_backoff` wrapper: the HTTP client's retry loop is entangled
//! with circuit-breaker bookkeeping (each failed attempt must update the
//! consecutive-failure counter even when the call eventually succeeds), so
//! the loop itself lives in [`crate::http`].

use std::time::Duration;

/// Backoff configuration: base delay, doubling per attempt, optional jitter.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied per additional attempt (2.0 = doubling).
    pub multiplier: f64,
    /// Jitter as a fraction of the computed delay (0.0 disables jitter).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl BackoffConfig {
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry attempt `attempt` (0-indexed: the delay before
    /// the *first* retry is `delay_for(0)`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponential_ms = base_ms * self.multiplier.powi(attempt as i32);

        if self.jitter_factor == 0.0 {
            return Duration::from_millis(exponential_ms.max(0.0) as u64);
        }

        let jitter_range = exponential_ms * self.jitter_factor;
        let jitter = rand::random::<f64>() * jitter_range - (jitter_range / 2.0);
        Duration::from_millis((exponential_ms + jitter).max(0.0) as u64)
    }
}
