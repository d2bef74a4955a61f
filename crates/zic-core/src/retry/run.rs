//! Retry loop: run a closure until success, a non-retryable error, or cancellation.

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::cancel::{CancelToken, Cancelled};

/// Why a retried operation stopped without succeeding.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The cancellation token fired (before an attempt or during a pause).
    Cancelled,
    /// The policy declined to retry; carries the last error.
    Failed(E),
}

impl<E> From<Cancelled> for RetryError<E> {
    fn from(_: Cancelled) -> Self {
        RetryError::Cancelled
    }
}

/// Runs `f` until it succeeds or the retry policy says to stop.
/// Cancellation is checked before every attempt and during every pause.
pub fn run_with_retry<T, E, F, C>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    classify: C,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    C: Fn(&E) -> ErrorKind,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        cancel.check()?;
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(RetryError::Failed(e)),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "{}, retrying", e);
                        cancel.sleep(d)?;
                        attempt += 1;
                    }
                }
            }
        }
    }
}
