use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::errors::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub exponential_base: f64,
    /// Upper bound for a single delay. Unbounded when unset.
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 1000,
            exponential_base: 2.0,
            max_delay_ms: None,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(exponent);

        // f64 -> u64 casts saturate, so huge exponents just clamp
        let delay = Duration::from_millis(delay_ms as u64);
        match self.max_delay_ms {
            Some(max) => delay.min(Duration::from_millis(max)),
            None => delay,
        }
    }
}

/// Run `operation` until it succeeds, fails with a permanent error, or
/// `max_attempts` attempts have been made. The closure receives the 1-based
/// attempt number. The last error is returned unchanged.
pub async fn with_backoff<T, F, Fut>(config: &RetryConfig, mut operation: F) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = config.backoff_delay(attempt);
                log::warn!(
                    "Attempt {}/{} failed, retrying in {:?}: {}",
                    attempt,
                    max_attempts,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    log::error!("Giving up after {} attempts: {}", attempt, e);
                }
                return Err(e);
            }
        }
    }
}
