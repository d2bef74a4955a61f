//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, client rejections) and randomized-delay decisions so
//! that the transfer unit and the song driver share a consistent policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status, classify_transport};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy, SIZING_ATTEMPTS};
pub use run::{run_with_retry, RetryError};
