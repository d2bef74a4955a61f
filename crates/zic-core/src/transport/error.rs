//! Transport error type for retry classification.

use std::fmt;

/// Error returned by a single request (curl failure, HTTP status, or broken body stream).
/// Kept separate from anyhow so callers can classify and decide retries.
#[derive(Debug)]
pub enum TransportError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// The response body stream failed after the headers arrived.
    Body(std::io::Error),
    /// The transfer thread could not be started or vanished.
    Worker(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Curl(e) => write!(f, "{}", e),
            TransportError::Http(code) => write!(f, "HTTP {}", code),
            TransportError::Body(e) => write!(f, "body: {}", e),
            TransportError::Worker(msg) => write!(f, "transfer thread: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Curl(e) => Some(e),
            TransportError::Body(e) => Some(e),
            TransportError::Http(_) | TransportError::Worker(_) => None,
        }
    }
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        TransportError::Curl(e)
    }
}
