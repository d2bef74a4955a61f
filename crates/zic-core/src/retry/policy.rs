use rand::Rng;
use std::time::Duration;

/// Attempt ceiling for the sizing stage of a transfer (missing size header,
/// implausibly small reply).
pub const SIZING_ATTEMPTS: u32 = 5;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/stall).
    Timeout,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Server-side failure status (5xx).
    Http5xx(u16),
    /// A sizing reply without a usable Content-Length, or one too small to
    /// be the real file.
    MissingHeader,
    /// Explicit client-error status (4xx), typically a temporary ban.
    /// Not retried at transport level.
    Rejected(u16),
    /// Any other error (not retried).
    Other,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Http5xx(_) | ErrorKind::MissingHeader
        )
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Randomized-delay retry policy.
///
/// Every retry waits a uniformly random duration in `[min_delay, max_delay]`
/// so parallel workers hitting the same throttled host spread out.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Maximum number of attempts (including the first); None = unbounded.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Same delays, capped at `attempts` tries.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Random pause in `[min_delay, max_delay]`.
    pub fn pause(&self) -> Duration {
        let lo = self.min_delay.as_millis() as u64;
        let hi = (self.max_delay.as_millis() as u64).max(lo);
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    /// Decide whether to retry after a failure of `kind` on `attempt`.
    ///
    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return RetryDecision::NoRetry;
            }
        }
        if kind.is_transient() {
            RetryDecision::RetryAfter(self.pause())
        } else {
            RetryDecision::NoRetry
        }
    }
}
