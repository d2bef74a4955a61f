//! Album job: one directory, one cover, N tracks, one verdict.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::{AlbumDescriptor, CatalogError};
use crate::naming::album_dir_name;
use crate::pool::run_bounded;
use crate::sink::Severity;
use crate::transfer::{FileRole, TransferTask};

use super::driver::{drive_task, TaskEnd};
use super::JobContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumVerdict {
    Pending,
    Complete,
    IncompleteMissingTracks,
    IncompleteFailedTracks,
    IncompleteAborted,
}

impl AlbumVerdict {
    /// Cancellation outranks missing tracks, which outrank failed ones.
    pub fn decide(aborted: bool, missing: bool, failed: bool) -> Self {
        if aborted {
            AlbumVerdict::IncompleteAborted
        } else if missing {
            AlbumVerdict::IncompleteMissingTracks
        } else if failed {
            AlbumVerdict::IncompleteFailedTracks
        } else {
            AlbumVerdict::Complete
        }
    }

    pub fn is_complete(self) -> bool {
        self == AlbumVerdict::Complete
    }
}

impl fmt::Display for AlbumVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlbumVerdict::Pending => "PENDING",
            AlbumVerdict::Complete => "FINISHED",
            AlbumVerdict::IncompleteMissingTracks => "ALBUM INCOMPLETE (tracks missing)",
            AlbumVerdict::IncompleteFailedTracks => "ALBUM INCOMPLETE (tracks failed)",
            AlbumVerdict::IncompleteAborted => "ALBUM INCOMPLETE (user exit)",
        };
        f.write_str(s)
    }
}

/// Final state of one cover or track.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub role: FileRole,
    pub name: String,
    /// None when the task never started.
    pub end: Option<TaskEnd>,
    /// Bytes in the destination file after the last attempt.
    pub transferred: u64,
    /// Body bytes read from the network across all attempts.
    pub fetched: u64,
}

#[derive(Debug, Clone)]
pub struct AlbumReport {
    pub url: Option<String>,
    pub directory: Option<PathBuf>,
    pub verdict: AlbumVerdict,
    /// Positions listed by the site but not served.
    pub missing: Vec<u32>,
    pub tasks: Vec<TaskReport>,
}

impl AlbumReport {
    fn without_tasks(url: Option<String>, directory: Option<PathBuf>, verdict: AlbumVerdict) -> Self {
        Self {
            url,
            directory,
            verdict,
            missing: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn track_reports(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|t| !t.role.is_cover())
    }
}

/// Tasks of one album, ready to run.
#[derive(Debug)]
pub struct AlbumJob {
    pub directory: PathBuf,
    pub cover_task: Option<TransferTask>,
    pub track_tasks: Vec<TransferTask>,
    pub missing: Vec<u32>,
    pub verdict: AlbumVerdict,
}

impl AlbumJob {
    /// Create the album directory under `base_dir` (if absent) and one task per
    /// file to fetch.
    pub fn prepare(ctx: &JobContext<'_>, album: &AlbumDescriptor, base_dir: &Path) -> io::Result<Self> {
        let directory = base_dir.join(album_dir_name(album, ctx.config.with_album_id));
        if !directory.is_dir() {
            fs::create_dir_all(&directory)?;
            tracing::debug!(dir = %directory.display(), "album directory created");
        }

        let cover_task = match album.cover_url {
            Some(ref url) => Some(TransferTask::cover(
                ctx.next_task_id(),
                url.clone(),
                &directory,
                ctx.config.cover_name.clone(),
            )),
            None => {
                ctx.sink.status(Severity::Warning, "No cover found for this album");
                None
            }
        };

        let mut track_tasks = Vec::with_capacity(album.tracks.len());
        let mut missing = Vec::new();
        for track in &album.tracks {
            match track.url {
                Some(ref url) => track_tasks.push(TransferTask::track(
                    ctx.next_task_id(),
                    track.position,
                    url.clone(),
                    &directory,
                )),
                None => {
                    ctx.sink.status(
                        Severity::Error,
                        &format!("The track number {:02} is missing from website", track.position),
                    );
                    missing.push(track.position);
                }
            }
        }

        Ok(Self {
            directory,
            cover_task,
            track_tasks,
            missing,
            verdict: AlbumVerdict::Pending,
        })
    }

    /// Run cover and tracks through the pool and settle the verdict.
    pub fn run(mut self, ctx: &JobContext<'_>) -> AlbumReport {
        let no_links = self.track_tasks.is_empty();
        if no_links {
            ctx.sink.status(
                Severity::Error,
                "Unable to detect any song links, skipping this album",
            );
        }

        let mut tasks: Vec<TransferTask> = Vec::with_capacity(self.track_tasks.len() + 1);
        tasks.extend(self.cover_task.take());
        tasks.append(&mut self.track_tasks);
        let pending: Vec<(FileRole, String)> = tasks.iter().map(|t| (t.role, t.display_name())).collect();

        let settings = ctx.transfer_settings();
        let results = run_bounded(tasks, ctx.config.connections, ctx.cancel, |mut task| {
            let end = drive_task(ctx, &settings, &mut task);
            (task, end)
        });

        let mut reports = Vec::with_capacity(results.len());
        for (slot, (role, placeholder)) in results.into_iter().zip(pending) {
            reports.push(match slot {
                Some((task, end)) => TaskReport {
                    role,
                    name: task.display_name(),
                    end: Some(end),
                    transferred: task.transferred,
                    fetched: task.fetched,
                },
                None => TaskReport {
                    role,
                    name: placeholder,
                    end: None,
                    transferred: 0,
                    fetched: 0,
                },
            });
        }

        let aborted = ctx.cancel.is_cancelled()
            || reports.iter().any(|r| r.end == Some(TaskEnd::Cancelled));
        for r in reports.iter().filter(|r| r.end.is_none() && !aborted) {
            ctx.sink
                .status(Severity::Error, &format!("{}: transfer stopped unexpectedly", r.name));
        }
        // A slot with no result outside a cancellation means the worker died.
        let failed = reports
            .iter()
            .filter(|r| !r.role.is_cover())
            .any(|r| r.end.as_ref().map_or(true, TaskEnd::is_failure));
        if let Some(cover) = reports.iter().find(|r| r.role.is_cover()) {
            if !cover.end.as_ref().map_or(false, TaskEnd::is_success) && !aborted {
                ctx.sink.status(Severity::Warning, "Album cover could not be downloaded");
            }
        }
        let done = reports
            .iter()
            .filter(|r| !r.role.is_cover() && r.end.as_ref().map_or(false, TaskEnd::is_success))
            .count();
        tracing::debug!(dir = %self.directory.display(), done, files = reports.len(), "album pool drained");

        self.verdict = AlbumVerdict::decide(aborted, no_links || !self.missing.is_empty(), failed);
        let severity = if self.verdict.is_complete() {
            Severity::Info
        } else {
            Severity::Error
        };
        ctx.sink.status(
            severity,
            &format!("{} {}", self.directory.display(), self.verdict),
        );

        AlbumReport {
            url: None,
            directory: Some(self.directory),
            verdict: self.verdict,
            missing: self.missing,
            tasks: reports,
        }
    }
}

/// Run an album from an already-parsed descriptor.
pub fn run_album_descriptor(ctx: &JobContext<'_>, album: &AlbumDescriptor, base_dir: &Path) -> AlbumReport {
    if ctx.cancel.is_cancelled() {
        return AlbumReport::without_tasks(None, None, AlbumVerdict::IncompleteAborted);
    }
    ctx.sink.status(
        Severity::Info,
        &format!(
            "{} - {}{}",
            album.artist,
            album.title,
            album.year.as_deref().map(|y| format!(" - {}", y)).unwrap_or_default()
        ),
    );
    match AlbumJob::prepare(ctx, album, base_dir) {
        Ok(job) => job.run(ctx),
        Err(e) => {
            ctx.sink.status(
                Severity::Error,
                &format!("Unable to create the album directory in {}: {}", base_dir.display(), e),
            );
            AlbumReport::without_tasks(None, None, AlbumVerdict::IncompleteFailedTracks)
        }
    }
}

/// Fetch the album page at `url` and run it. Page failures become an
/// incomplete verdict rather than an error.
pub fn run_album(ctx: &JobContext<'_>, url: &str, base_dir: &Path) -> AlbumReport {
    let url_owned = Some(url.to_string());
    if ctx.cancel.is_cancelled() {
        return AlbumReport::without_tasks(url_owned, None, AlbumVerdict::IncompleteAborted);
    }
    match ctx.catalog.album(url) {
        Ok(album) => {
            let mut report = run_album_descriptor(ctx, &album, base_dir);
            report.url = url_owned;
            report
        }
        Err(CatalogError::Cancelled(_)) => {
            AlbumReport::without_tasks(url_owned, None, AlbumVerdict::IncompleteAborted)
        }
        Err(e) => {
            ctx.sink
                .status(Severity::Error, &format!("Unable to get the album page: {}", e));
            AlbumReport::without_tasks(url_owned, None, AlbumVerdict::IncompleteMissingTracks)
        }
    }
}
