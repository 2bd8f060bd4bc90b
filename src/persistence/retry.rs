//! Timeouts and bounded retries around store calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::StoreError;
use crate::config::GatewayConfig;

/// Per-call timeout plus exponential backoff with jitter for transient
/// store failures.
///
/// `delay = min(initial_delay * 2^attempt, max_delay) * uniform(0.5, 1.0)`
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    max_attempts: u32,
    /// Delay before the first retry.
    initial_delay: Duration,
    /// Cap on any single delay.
    max_delay: Duration,
    /// Bound on each individual attempt.
    op_timeout: Duration,
}

impl RetryPolicy {
    /// Defaults: 3 attempts, 100 ms initial delay, 2 s cap, 5 s per attempt.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            op_timeout: Duration::from_secs(5),
        }
    }

    /// Builds the policy from the `STORE_*` configuration keys.
    #[must_use]
    pub const fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_attempts: config.store_retry_max_attempts,
            initial_delay: Duration::from_millis(config.store_retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.store_retry_max_delay_ms),
            op_timeout: Duration::from_millis(config.store_op_timeout_ms),
        }
    }

    /// Set the number of attempts (at least one is always made).
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Backoff before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let capped = (self.initial_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::from_secs_f64(capped * jitter)
    }

    /// Runs `op` once under the per-attempt timeout, without retrying.
    ///
    /// Used for non-idempotent writes where a retry could observe the
    /// first attempt's effect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] on timeout, or the operation's error.
    pub async fn once<T, Fut>(&self, op: &'static str, fut: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout { op })?
    }

    /// Runs `op` with timeout, retrying transient failures with backoff.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// non-transient error immediately.
    pub async fn run<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.once(op, f()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        op,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(1))
            .with_op_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast_policy()
            .run("flaky", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable("connection reset".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(assert_ok!(result), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast_policy()
            .with_max_attempts(2)
            .run("down", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Unavailable("refused".to_string()))
            })
            .await;
        assert!(matches!(assert_err!(result), StoreError::Unavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn backend_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast_policy()
            .run("broken", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Backend("syntax error".to_string()))
            })
            .await;
        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_call_times_out() {
        let result: Result<(), _> = fast_policy()
            .once("stalled", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Timeout { op: "stalled" })
        ));
    }

    #[test]
    fn delay_is_capped_and_jittered() {
        let policy = RetryPolicy::new();
        for attempt in 0..10 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay <= Duration::from_secs(2));
        }
        assert!(policy.delay_for_attempt(0) >= Duration::from_millis(50));
    }
}
