//! Exponential backoff for transient side effects.
//!
//! [`RetryPolicy::run`] wraps any async operation and re-invokes it while the
//! caller-supplied predicate classifies the error as transient. The media
//! upload and the article insert share the same policy.
//!
//! # Backoff Strategy
//!
//! The delay after the n-th failed attempt is:
//! ```text
//! delay = min(base_delay * 2^(n-1), max_delay)
//! ```
//! With the default policy (3 attempts, 2s base, 10s cap) a permanently
//! failing operation waits 2s then 4s before giving up.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

/// Attempt budget and delay curve for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    max_attempts: usize,
    /// Delay after the first failure (doubles with each attempt).
    base_delay: Duration,
    /// Upper bound on any single delay.
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2), Duration::from_secs(10))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, the error is not retryable, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !retryable(&e) {
                        error!(
                            label,
                            attempt,
                            error = %e,
                            "{label} failed with a non-retryable error"
                        );
                        return Err(e);
                    }

                    if attempt >= self.max_attempts {
                        error!(
                            label,
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "{label} exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        label,
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "{label} attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
