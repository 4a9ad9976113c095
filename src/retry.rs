//! Bounded exponential-backoff retry for datastore operations.
//!
//! Every persistence call made by the provisioning saga and the bulk
//! reassignment tool goes through [`with_retry`]. Intermediate failures are
//! logged as warnings; only the final attempt's error is surfaced.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Retry knobs for transient-failure-prone operations.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay used for the backoff computation.
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `n + 1`, given `n` attempts have failed:
    /// `min(2^n * base_delay_ms, max_delay_ms)`.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exp = 2u64
            .checked_pow(failed_attempts)
            .unwrap_or(u64::MAX / self.base_delay_ms.max(1));
        let millis = exp
            .saturating_mul(self.base_delay_ms)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

/// Runs `op` up to `policy.max_attempts` times with exponential backoff.
///
/// All errors are retried uniformly; the saga does not attempt to tell
/// transient failures from permanent ones at this layer.
pub async fn with_retry<T, E, F, Fut>(op_name: &str, policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation = op_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying after backoff"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
        // Capped at max_delay_ms.
        assert_eq!(policy.delay_after(10), Duration::from_millis(10_000));
        assert_eq!(policy.delay_after(63), Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            with_retry("test.op", RetryPolicy::default(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("boom {n}"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surfaces_only_final_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> =
            with_retry("test.op", RetryPolicy::default(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("boom {n}"))
            })
            .await;

        assert_eq!(result, Err("boom 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_attempt_success_skips_backoff() {
        let result: Result<&str, String> =
            with_retry("test.op", RetryPolicy::default(), || async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
    }
}
