//! Transfer Unit: fetch one file end to end.
//!
//! Size discovery, resume decision (append after a `206`, restart after a
//! `200`), chunked copy with per-chunk progress and cancellation polling, and
//! final size verification. Partial files are never deleted: they are what
//! the next attempt resumes from.

mod outcome;
mod task;

pub use outcome::{FailureReason, Outcome};
pub use task::{FileRole, TaskState, TransferTask};

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::cancel::{CancelToken, Cancelled};
use crate::naming::{self, NamingRule};
use crate::retry::{
    classify_transport, run_with_retry, ErrorKind, RetryDecision, RetryError, RetryPolicy, SIZING_ATTEMPTS,
};
use crate::sink::{FinishedTask, ProgressEvent, Sink};
use crate::transport::{ByteRange, Request, Response, Transport, TransportError};

/// Copy buffer size.
pub const CHUNK_SIZE: usize = 8192;
/// Buffer size when the whole payload is smaller than [`CHUNK_SIZE`].
pub const SMALL_CHUNK_SIZE: usize = 512;

/// Per-source knobs for the Transfer Unit.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Non-cover files at or below this size are error pages, not tracks.
    pub min_page_size: u64,
    /// Whether byte-range resumes can be trusted on this source.
    pub resume_safe: bool,
    pub naming: NamingRule,
    /// Transport-level retry (transient errors only).
    pub retry: RetryPolicy,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            min_page_size: 8192,
            resume_safe: true,
            naming: NamingRule::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Why a step stopped early: cancellation, or a terminal outcome.
enum Halt {
    Cancelled,
    Done(Outcome),
}

impl From<Cancelled> for Halt {
    fn from(_: Cancelled) -> Self {
        Halt::Cancelled
    }
}

fn retryable(reason: FailureReason) -> Halt {
    Halt::Done(Outcome::Retryable(reason))
}

fn permanent(reason: FailureReason) -> Halt {
    Halt::Done(Outcome::Permanent(reason))
}

/// Reply to the sizing request, accepted for use.
struct SizingReply {
    response: Response,
    remote: Option<u64>,
}

pub struct TransferUnit<'a> {
    transport: &'a dyn Transport,
    sink: &'a dyn Sink,
    cancel: &'a CancelToken,
    settings: &'a TransferSettings,
}

impl<'a> TransferUnit<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sink: &'a dyn Sink,
        cancel: &'a CancelToken,
        settings: &'a TransferSettings,
    ) -> Self {
        Self {
            transport,
            sink,
            cancel,
            settings,
        }
    }

    /// Run one attempt. `Err(Cancelled)` leaves the partial file in place.
    pub fn run(&self, task: &mut TransferTask) -> Result<Outcome, Cancelled> {
        let result = self.attempt(task);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(Halt::Done(outcome)) => outcome,
            Err(Halt::Cancelled) => {
                task.state = TaskState::Cancelled;
                return Err(Cancelled);
            }
        };
        task.state = match &outcome {
            Outcome::Complete { .. } => TaskState::Complete,
            Outcome::AlreadyComplete => TaskState::Skipped,
            Outcome::Retryable(_) | Outcome::Permanent(_) => TaskState::Failed,
        };
        Ok(outcome)
    }

    fn attempt(&self, task: &mut TransferTask) -> Result<Outcome, Halt> {
        self.cancel.check()?;
        task.state = TaskState::Sizing;
        task.transferred = 0;

        let SizingReply { response, remote } = self.size(task)?;
        let name = self.destination_name(task, &response)?;
        let path = task.dir.join(&name);
        task.name = Some(name.clone());
        task.expected = remote;
        self.sink.begin(task.id, &name);

        let mut local = local_size(&path).map_err(|e| permanent(FailureReason::Storage(e)))?;
        if !task.role.is_cover() && local > 0 && local <= self.settings.min_page_size {
            tracing::debug!(file = %name, local, "local file too small to be a track, starting over");
            local = 0;
        }

        let (response, append) = match remote {
            Some(remote) if local == remote => {
                tracing::debug!(file = %name, remote, "already complete");
                task.transferred = local;
                self.sink.finish(
                    task.id,
                    &FinishedTask {
                        name,
                        transferred: local,
                        total: Some(remote),
                    },
                );
                return Ok(Outcome::AlreadyComplete);
            }
            Some(remote) if local > remote => {
                return Err(permanent(FailureReason::LocalLarger { local, remote }));
            }
            Some(remote) if local > 0 => self.resume(task, response, local, remote)?,
            Some(_) => (response, false),
            None if local > 0 => {
                return Err(permanent(FailureReason::UnknownRemoteSize { local }));
            }
            None => (response, false),
        };

        task.transferred = if append { local } else { 0 };
        self.stream(task, &path, response, append)
    }

    /// Issue the sizing request until it yields a usable size, or give up on
    /// the size after [`SIZING_ATTEMPTS`] tries.
    fn size(&self, task: &TransferTask) -> Result<SizingReply, Halt> {
        let policy = self.settings.retry.with_max_attempts(SIZING_ATTEMPTS);
        let mut attempt = 1u32;
        loop {
            let response = self.open(&Request::get(task.url.clone()))?;
            let remote = response.headers.content_length;
            let block_page = match remote {
                None => {
                    tracing::debug!(url = %task.url, attempt, "no content-length");
                    None
                }
                Some(size) if !task.role.is_cover() && size <= self.settings.min_page_size => {
                    tracing::warn!(
                        url = %task.url,
                        size,
                        attempt,
                        "served file too small (<= {})",
                        self.settings.min_page_size
                    );
                    Some(size)
                }
                Some(_) => return Ok(SizingReply { response, remote }),
            };
            match policy.decide(attempt, ErrorKind::MissingHeader) {
                RetryDecision::RetryAfter(pause) => {
                    drop(response);
                    self.cancel.sleep(pause)?;
                    attempt += 1;
                }
                RetryDecision::NoRetry => match block_page {
                    Some(size) => return Err(retryable(FailureReason::SuspectedBlockPage { size })),
                    None => {
                        tracing::warn!(url = %task.url, "unable to get the size from the server, downloading unverified");
                        return Ok(SizingReply { response, remote });
                    }
                },
            }
        }
    }

    /// Ask for the missing tail. Returns the reply to stream and whether to append.
    fn resume(
        &self,
        task: &TransferTask,
        sized: Response,
        local: u64,
        remote: u64,
    ) -> Result<(Response, bool), Halt> {
        if !self.settings.resume_safe {
            tracing::debug!(url = %task.url, local, "resume disabled for this source, restarting");
            return Ok((sized, false));
        }
        drop(sized);

        let ranged = self.open(&Request::get(task.url.clone()).with_range(ByteRange::resume(local, remote)))?;
        if !ranged.is_partial() {
            tracing::debug!(url = %task.url, status = ranged.status, "range not honored, restarting");
            return Ok((ranged, false));
        }
        match ranged.headers.content_range.as_deref().and_then(content_range_start) {
            Some(start) if start != local => {
                tracing::warn!(url = %task.url, start, local, "server resumed at the wrong offset, restarting");
                drop(ranged);
                Ok((self.open(&Request::get(task.url.clone()))?, false))
            }
            _ => {
                tracing::debug!(url = %task.url, local, remote, "resuming");
                Ok((ranged, true))
            }
        }
    }

    fn stream(
        &self,
        task: &mut TransferTask,
        path: &Path,
        mut response: Response,
        append: bool,
    ) -> Result<Outcome, Halt> {
        task.state = TaskState::Streaming;
        let remote = task.expected;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|e| permanent(FailureReason::Storage(e)))?;

        let mut buf = vec![0u8; chunk_size(remote)];
        loop {
            let n = match response.body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(url = %task.url, received = task.transferred, "body read failed: {}", e);
                    return Err(retryable(FailureReason::Transport(TransportError::Body(e))));
                }
            };
            file.write_all(&buf[..n])
                .map_err(|e| permanent(FailureReason::Storage(e)))?;
            task.transferred += n as u64;
            task.fetched += n as u64;
            self.sink.progress(ProgressEvent {
                task: task.id,
                total: remote,
                delta: n as u64,
            });
            if let Some(expected) = remote {
                if task.transferred > expected {
                    return Err(permanent(FailureReason::Oversized {
                        expected,
                        received: task.transferred,
                    }));
                }
            }
            self.cancel.check()?;
        }
        file.flush().map_err(|e| permanent(FailureReason::Storage(e)))?;

        let name = task.display_name();
        match remote {
            Some(expected) if task.transferred < expected => Err(retryable(FailureReason::Incomplete {
                expected,
                received: task.transferred,
            })),
            Some(_) => {
                self.finished(task, name);
                Ok(Outcome::Complete { verified: true })
            }
            None => {
                tracing::warn!(file = %name, bytes = task.transferred, "downloaded, but the size could not be verified");
                self.finished(task, name);
                Ok(Outcome::Complete { verified: false })
            }
        }
    }

    fn finished(&self, task: &TransferTask, name: String) {
        self.sink.finish(
            task.id,
            &FinishedTask {
                name,
                transferred: task.transferred,
                total: task.expected,
            },
        );
    }

    fn destination_name(&self, task: &TransferTask, response: &Response) -> Result<String, Halt> {
        match task.role {
            FileRole::Cover => Ok(task.name.clone().unwrap_or_else(|| "cover.jpg".to_string())),
            FileRole::Track { position } => naming::track_file_name(
                &self.settings.naming,
                position,
                &task.url,
                response.headers.content_disposition.as_deref(),
            )
            .ok_or_else(|| retryable(FailureReason::NoFilename)),
        }
    }

    /// Open `request`, retrying transient failures per the transport policy.
    fn open(&self, request: &Request) -> Result<Response, Halt> {
        run_with_retry(&self.settings.retry, self.cancel, classify_transport, || {
            self.transport.open(request)
        })
        .map_err(|e| match e {
            RetryError::Cancelled => Halt::Cancelled,
            RetryError::Failed(e) => retryable(FailureReason::from_transport(e)),
        })
    }
}

/// Size of an existing file; 0 if it does not exist.
fn local_size(path: &Path) -> io::Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

fn chunk_size(remote: Option<u64>) -> usize {
    match remote {
        Some(r) if r < CHUNK_SIZE as u64 => SMALL_CHUNK_SIZE,
        _ => CHUNK_SIZE,
    }
}

/// First byte offset of `bytes start-end/total`.
fn content_range_start(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = rest.split_once('-')?;
    start.trim().parse().ok()
}
