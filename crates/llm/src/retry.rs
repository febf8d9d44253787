//! Timeout and bounded retry for provider calls.
//!
//! Every translation and generation call goes through a [`RetryPolicy`]. Each
//! attempt is bounded by an explicit timeout; transient failures are retried
//! with exponential backoff (`base * 2^attempt`) up to `max_retries` extra
//! attempts, after which the last error is returned for the caller to degrade.

use std::future::Future;
use std::time::Duration;

use campus_core::config::ProviderCallConfig;
use campus_core::{AppError, AppResult};
use tokio::time::{sleep, timeout};

/// Retry settings shared by all provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_backoff: Duration,

    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ProviderCallConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ProviderCallConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.retry_base_backoff_ms),
            attempt_timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Backoff before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 2_u32.saturating_pow(attempt);
        self.base_backoff.saturating_mul(multiplier)
    }

    /// Run `call` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0_u32;

        loop {
            let result = match timeout(self.attempt_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "{} exceeded {} ms",
                    operation,
                    self.attempt_timeout.as_millis()
                ))),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient provider failure, retrying"
                    );
                    sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
