//! Retry-with-backoff for fallible async operations.
//!
//! After failed attempt `k` (1-indexed) the executor suspends for
//! `min(2^k * base_delay, max_delay)` before attempt `k + 1`. The last
//! failure is returned unchanged once all attempts are used up, and no delay
//! follows the final attempt.
//!
//! The suspension goes through a [`Sleeper`], so it never blocks the thread;
//! the default [`TokioSleeper`] uses `tokio::time::sleep`.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

/// Non-blocking timed suspension used between retry attempts.
pub trait Sleeper: Send + Sync {
    /// Returns a future that completes after `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default cap on a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Runs an operation up to a bounded number of times with exponential backoff.
#[derive(Clone)]
pub struct RetryExecutor {
    base_delay: Duration,
    max_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryExecutor {
    /// Creates an executor using the tokio timer.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper (builder pattern).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay to wait after failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        // 2^attempt saturates for attempt >= 32.
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` up to `max_attempts` times.
    ///
    /// Returns the first success immediately. When every attempt fails the
    /// last error is returned. A `max_attempts` of zero still runs the
    /// operation once.
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        operation: F,
        max_attempts: u32,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_counted(operation, max_attempts).await.0
    }

    /// Like [`execute_with_retry`](Self::execute_with_retry), but also returns
    /// the number of attempts made.
    pub async fn execute_counted<F, Fut, T, E>(
        &self,
        operation: F,
        max_attempts: u32,
    ) -> (Result<T, E>, u32)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return (Ok(value), attempt);
                }
                Err(err) if attempt >= max_attempts => {
                    warn!(attempts = attempt, error = %err, "Operation failed, retries exhausted");
                    return (Err(err), attempt);
                }
                Err(err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after failure"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Records requested delays and completes immediately.
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
            self.delays.lock().push(duration);
            Box::pin(async {})
        }
    }

    fn executor(sleeper: &Arc<RecordingSleeper>) -> RetryExecutor {
        RetryExecutor::new(Duration::from_millis(1000), Duration::from_secs(60))
            .with_sleeper(sleeper.clone())
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_after_two_backoffs() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = &AtomicU32::new(0);

        let result: Result<&str, String> = executor(&sleeper)
            .execute_with_retry(
                move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok("done")
                    }
                },
                3,
            )
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let delays = sleeper.delays.lock().clone();
        assert_eq!(delays.len(), 2);
        assert!(delays[1] >= delays[0] * 2);
        assert_eq!(delays[0], Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn always_failing_returns_last_error_without_trailing_delay() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = &AtomicU32::new(0);

        let (result, attempts) = executor(&sleeper)
            .execute_counted(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Err::<(), _>(format!("failure {n}"))
                },
                3,
            )
            .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(attempts, 3);
        assert_eq!(sleeper.delays.lock().len(), 2);
    }

    #[tokio::test]
    async fn immediate_success_does_not_sleep() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let result: Result<u8, String> = executor(&sleeper)
            .execute_with_retry(|| async { Ok(7) }, 3)
            .await;
        assert_eq!(result, Ok(7));
        assert!(sleeper.delays.lock().is_empty());
    }

    #[tokio::test]
    async fn zero_attempts_runs_once() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = &AtomicU32::new(0);
        let (result, attempts) = executor(&sleeper)
            .execute_counted(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("boom")
                },
                0,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_respects_max_cap() {
        let executor = RetryExecutor::new(Duration::from_millis(500), Duration::from_secs(5));
        assert_eq!(executor.delay_after(1), Duration::from_secs(1));
        assert_eq!(executor.delay_after(10), Duration::from_secs(5));
        assert_eq!(executor.delay_after(64), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_suspends_on_the_timer() {
        let executor = RetryExecutor::new(Duration::from_millis(100), Duration::from_secs(1));
        let calls = &AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let _ = executor
            .execute_with_retry(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("down")
                },
                3,
            )
            .await;

        // 200ms after the first failure, 400ms after the second.
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }
}
