//! Fixed-delay retry for completion calls.
//!
//! Both the question generator and the evaluation pipeline retry with a constant
//! delay between attempts; they differ only in which failures qualify.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// The last error seen once the policy gave up.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
}

/// Runs `attempt` until it succeeds, `should_retry` rejects the error, or the
/// policy's attempt budget is spent. `attempt` receives the 1-based attempt number.
pub async fn run_with_retry<T, E, F, Fut, R>(
    policy: RetryPolicy,
    operation: &str,
    mut attempt: F,
    should_retry: R,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if n >= policy.max_attempts || !should_retry(&error) {
                    return Err(RetryFailure { error, attempts: n });
                }
                warn!(
                    operation,
                    attempt = n,
                    max_attempts = policy.max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %error,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                n += 1;
            }
        }
    }
}
