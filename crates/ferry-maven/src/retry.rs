//! Bounded exponential backoff for idempotent staging calls.

use std::future::Future;
use std::time::Duration;

use ferry_core::config::StagingConfig;
use ferry_util::errors::FerryResult;

/// How often, and how patiently, a retryable call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &StagingConfig) -> Self {
        Self {
            max_attempts: config.retries.max(1),
            base_delay: config.retry_delay(),
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt number `attempt` (1-based; the first attempt
    /// has no delay).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.base_delay * self.multiplier.saturating_pow(attempt - 2)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> FerryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FerryResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    attempt += 1;
                    let delay = self.delay_before(attempt);
                    tracing::warn!(
                        "{what} failed ({e}); retrying in {}ms (attempt {attempt}/{})",
                        delay.as_millis(),
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
