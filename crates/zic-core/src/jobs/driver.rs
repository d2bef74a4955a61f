//! Song-level driver: repeat the Transfer Unit until the file is done.

use crate::catalog::CatalogError;
use crate::sink::Severity;
use crate::transfer::{FailureReason, FileRole, Outcome, TaskState, TransferSettings, TransferTask, TransferUnit};

use super::JobContext;

/// How a task ended for its album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEnd {
    Complete { verified: bool },
    AlreadyComplete,
    /// `permanent` is false when the attempt ceiling ran out.
    Failed { reason: String, permanent: bool },
    Cancelled,
}

impl TaskEnd {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskEnd::Complete { .. } | TaskEnd::AlreadyComplete)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskEnd::Failed { .. })
    }
}

/// Drive `task` until it succeeds, fails permanently, runs out of attempts
/// (`file_attempt_limit`), or the run is cancelled. Track addresses go
/// through the catalog's second-hop resolution before every attempt.
pub fn drive_task(ctx: &JobContext<'_>, settings: &TransferSettings, task: &mut TransferTask) -> TaskEnd {
    let unit = TransferUnit::new(ctx.transport, ctx.sink, ctx.cancel, settings);
    let origin = task.url.clone();
    let limit = ctx.config.file_attempt_limit;
    let policy = ctx.retry_policy();
    let mut attempt = 0u32;

    loop {
        if ctx.cancel.is_cancelled() {
            task.state = TaskState::Cancelled;
            return TaskEnd::Cancelled;
        }
        attempt += 1;

        let problem = 'attempt: {
            if let FileRole::Track { .. } = task.role {
                match ctx.catalog.resolve_track(&origin) {
                    Ok(file_url) => task.url = file_url,
                    Err(CatalogError::Cancelled(_)) => {
                        task.state = TaskState::Cancelled;
                        return TaskEnd::Cancelled;
                    }
                    Err(e) => break 'attempt e.to_string(),
                }
            }
            tracing::debug!(task = task.id, attempt, url = %task.url, "downloading");

            match unit.run(task) {
                Err(_) => return TaskEnd::Cancelled,
                Ok(Outcome::Complete { verified }) => {
                    if !verified {
                        ctx.sink.status(
                            Severity::Warning,
                            &format!(
                                "{} (file downloaded, but could not verify if it is complete)",
                                task.display_name()
                            ),
                        );
                    }
                    return TaskEnd::Complete { verified };
                }
                Ok(Outcome::AlreadyComplete) => {
                    ctx.sink
                        .status(Severity::Info, &format!("{} (already complete)", task.display_name()));
                    return TaskEnd::AlreadyComplete;
                }
                Ok(Outcome::Permanent(reason)) => {
                    let text = format!("{}: {}", task.display_name(), reason);
                    ctx.sink.status(Severity::Error, &text);
                    return TaskEnd::Failed {
                        reason: text,
                        permanent: true,
                    };
                }
                Ok(Outcome::Retryable(reason)) => {
                    if let FailureReason::Rejected(_) = reason {
                        ctx.sink.status(Severity::Error, &format!("{}: {}", task.display_name(), reason));
                    }
                    reason.to_string()
                }
            }
        };

        if let Some(max) = limit {
            if attempt >= max {
                let text = format!("{}: giving up after {} attempts: {}", task.display_name(), attempt, problem);
                ctx.sink.status(Severity::Error, &text);
                task.state = TaskState::Failed;
                return TaskEnd::Failed {
                    reason: text,
                    permanent: false,
                };
            }
        }
        tracing::debug!(task = task.id, attempt, "problem while downloading {}, retrying: {}", task.display_name(), problem);
        if ctx.cancel.sleep(policy.pause()).is_err() {
            task.state = TaskState::Cancelled;
            return TaskEnd::Cancelled;
        }
    }
}
