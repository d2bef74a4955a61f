//! Job hierarchy: artist -> albums (sequential) -> cover + tracks (pooled).

mod album;
mod artist;
mod driver;

pub use album::{run_album, run_album_descriptor, AlbumJob, AlbumReport, AlbumVerdict, TaskReport};
pub use artist::{run_artist, ArtistReport};
pub use driver::{drive_task, TaskEnd};

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cancel::CancelToken;
use crate::catalog::{Catalog, CatalogError, RootKind};
use crate::config::ZicConfig;
use crate::retry::RetryPolicy;
use crate::sink::{Sink, TaskId};
use crate::transfer::TransferSettings;
use crate::transport::Transport;

/// Collaborators shared by every job of a run.
pub struct JobContext<'a> {
    pub transport: &'a dyn Transport,
    pub catalog: &'a dyn Catalog,
    pub sink: &'a dyn Sink,
    pub cancel: &'a CancelToken,
    pub config: &'a ZicConfig,
    next_id: AtomicUsize,
}

impl<'a> JobContext<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        catalog: &'a dyn Catalog,
        sink: &'a dyn Sink,
        cancel: &'a CancelToken,
        config: &'a ZicConfig,
    ) -> Self {
        Self {
            transport,
            catalog,
            sink,
            cancel,
            config,
            next_id: AtomicUsize::new(0),
        }
    }

    pub(crate) fn next_task_id(&self) -> TaskId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry_policy()
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        let traits = self.catalog.source_traits();
        TransferSettings {
            min_page_size: self.config.min_page_size,
            resume_safe: traits.resume_safe,
            naming: traits.naming,
            retry: self.retry_policy(),
        }
    }
}

/// Result of one root address.
#[derive(Debug)]
pub enum RunReport {
    Album(AlbumReport),
    Artist(ArtistReport),
}

impl RunReport {
    pub fn aborted(&self) -> bool {
        match self {
            RunReport::Album(a) => a.verdict == AlbumVerdict::IncompleteAborted,
            RunReport::Artist(a) => a.aborted,
        }
    }

    pub fn albums(&self) -> Vec<&AlbumReport> {
        match self {
            RunReport::Album(a) => vec![a],
            RunReport::Artist(a) => a.albums.iter().collect(),
        }
    }
}

/// Download whatever `url` designates. An address the catalog does not
/// recognize is the only error: everything below is folded into verdicts.
pub fn run_root(ctx: &JobContext<'_>, url: &str, base_dir: &Path) -> Result<RunReport, CatalogError> {
    match ctx.catalog.kind_of(url) {
        Some(RootKind::Artist) => Ok(RunReport::Artist(run_artist(ctx, url, base_dir))),
        Some(RootKind::Album) => Ok(RunReport::Album(run_album(ctx, url, base_dir))),
        None => Err(CatalogError::Unrecognized(url.to_string())),
    }
}
