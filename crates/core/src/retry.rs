//! Retry wrapper re-running a failed extraction attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::Result;

/// Default number of additional attempts after the first one
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How often, and how patiently, a failed extraction is tried again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first; total tries are `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each one after. Zero means none.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, backoff: Duration::ZERO }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Default::default() }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total number of tries, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.backoff.is_zero() {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor)
    }

    /// Runs `operation` until it succeeds or attempts run out.
    ///
    /// `operation` receives the 1-based attempt number and must build a fresh
    /// future each time. Failures before the last attempt are logged as
    /// warnings; the last failure, or any non-retryable one, is returned
    /// unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= attempts || !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(attempt, max_attempts = attempts, error = %e, "Attempt failed, retrying");
                    let delay = self.delay_for(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SiphonError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3).with_backoff(Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_always_failing_tries_four_times() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<()> = RetryPolicy::default()
            .run(|attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SiphonError::Navigation(format!("attempt {attempt} failed")))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(SiphonError::Navigation(message)) => assert_eq!(message, "attempt 4 failed"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = RetryPolicy::default()
            .run(|attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 { Err(SiphonError::NoContent) } else { Ok(attempt) }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<()> = RetryPolicy::default()
            .run(|_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SiphonError::InvalidInput("no url".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(SiphonError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let _ = RetryPolicy::new(0)
            .run(|_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(SiphonError::NoContent)
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<()> = RetryPolicy::new(2)
            .with_backoff(Duration::from_secs(1))
            .run(|_| async { Err(SiphonError::NoContent) })
            .await;

        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
