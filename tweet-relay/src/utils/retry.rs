//! Bounded exponential backoff for rate-limited or flaky HTTP boundaries.

use rand::random;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// How an error should be handled by [`retry_with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Not retryable; return the error.
    Stop,
    /// Retry after the computed exponential delay.
    Retry,
    /// Retry after the delay requested by the remote side.
    RetryAfter(Duration),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for the given zero-based retry number, with up to
    /// 25% jitter, never above `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;

        let exp_backoff_ms = base_ms.saturating_mul(1u64 << attempt.min(20));
        let capped_ms = exp_backoff_ms.min(max_ms);
        let jitter_ms = random::<u64>() % (capped_ms / 4 + 1);
        Duration::from_millis((capped_ms + jitter_ms).min(max_ms))
    }
}

/// Run `op` until it succeeds, `classify` says stop, or attempts run out.
///
/// A remote wait longer than `max_delay` ends the retries; the caller's next
/// scheduled run picks the work up instead.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    op_name: &str,
    policy: &RetryPolicy,
    classify: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> Backoff,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(err);
                }

                let delay = match classify(&err) {
                    Backoff::Stop => return Err(err),
                    Backoff::Retry => policy.delay_for(attempt - 1),
                    Backoff::RetryAfter(wait) if wait > policy.max_delay => {
                        debug!(
                            "{} asked to wait {:?}, longer than {:?}; giving up for now",
                            op_name, wait, policy.max_delay
                        );
                        return Err(err);
                    }
                    Backoff::RetryAfter(wait) => wait,
                };

                debug!(
                    error = %err,
                    "{} failed, retrying in {:?} (attempt {}/{})",
                    op_name,
                    delay,
                    attempt,
                    policy.max_attempts
                );
                sleep(delay).await;
            }
        }
    }
}
