//! Bounded retry with exponential backoff for generation calls.
//!
//! Transient upstream failures (rate limits, 5xx, timeouts) are retried with
//! jittered exponential backoff, honoring an upstream-suggested Retry-After
//! delay when present. Permanent failures and exhausted retries surface as
//! `GenerationFailed`.

use mockview_core::error::{MockviewError, Result};
use mockview_core::generation::GenerationError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

const BACKOFF_FACTOR: f64 = 2.0;

/// Retry policy applied to every call into the question generator.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Always at least 1.
    pub max_attempts: u32,
    /// Base delay of the exponential backoff.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &mockview_core::config::GenerationConfig) -> Self {
        Self::new(config.retry_max_attempts, config.retry_base_delay())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = BACKOFF_FACTOR.powi(attempt.saturating_sub(1) as i32);
        let base = self.base_delay.as_millis() as f64 * exp;
        let jitter = rand::thread_rng().gen_range(0.9..1.1);
        Duration::from_millis((base * jitter) as u64)
    }

    /// Runs `operation`, retrying transient failures up to the attempt budget.
    pub async fn run<T, F, Fut>(&self, op_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, GenerationError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = err.retry_after().unwrap_or_else(|| self.backoff(attempt));
                    tracing::warn!(
                        target: "generation",
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        op_name,
                        attempt,
                        self.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        target: "generation",
                        "{} failed after {} attempt(s): {}",
                        op_name,
                        attempt,
                        err
                    );
                    return Err(MockviewError::generation_failed(err.to_string()));
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test_op", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GenerationError::transient("busy"))
                } else {
                    Ok(42u32)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_fails_without_retry() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result: Result<u32> = policy
            .run("test_op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::permanent("bad request"))
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            MockviewError::GenerationFailed(_)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_surfaces_generation_failed() {
        let policy = RetryPolicy::new(3, Duration::from_millis(50));
        let calls = AtomicU32::new(0);

        let result: Result<u32> = policy
            .run("test_op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::transient("still busy"))
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            MockviewError::GenerationFailed(_)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_honored() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = policy
            .run("test_op", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GenerationError::transient_with_retry_after(
                        "rate limited",
                        Duration::from_secs(30),
                    ))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}
