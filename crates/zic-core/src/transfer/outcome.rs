use std::io;

use crate::transport::TransportError;

/// Terminal result of one Transfer Unit run.
#[derive(Debug)]
pub enum Outcome {
    /// Body fully written. `verified` is false when the server never
    /// advertised a size to check against.
    Complete { verified: bool },
    /// Local file already matches the remote size; nothing was read.
    AlreadyComplete,
    /// Worth another whole-file attempt (after a pause).
    Retryable(FailureReason),
    /// Needs operator attention; never retried automatically.
    Permanent(FailureReason),
}

#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("server refused the request (HTTP {0}); too many downloads too fast can get you banned for a while")]
    Rejected(u16),
    #[error("local file error: {0}")]
    Storage(#[source] io::Error),
    #[error("unable to get a file name from the server")]
    NoFilename,
    #[error("served file is only {size} bytes, probably an error or download-limit page")]
    SuspectedBlockPage { size: u64 },
    #[error("download incomplete: {received} of {expected} bytes")]
    Incomplete { expected: u64, received: u64 },
    #[error("received {received} bytes but the server announced {expected}; check the file manually")]
    Oversized { expected: u64, received: u64 },
    #[error("local file ({local} bytes) is already bigger than the server's ({remote} bytes); check it manually or delete it to retry")]
    LocalLarger { local: u64, remote: u64 },
    #[error("the server gave no size to compare with the local file ({local} bytes); check it manually or delete it to retry")]
    UnknownRemoteSize { local: u64 },
}

impl FailureReason {
    /// Client-error statuses become [`FailureReason::Rejected`].
    pub fn from_transport(e: TransportError) -> Self {
        match e {
            TransportError::Http(code) if (400..500).contains(&code) => FailureReason::Rejected(code as u16),
            other => FailureReason::Transport(other),
        }
    }
}
