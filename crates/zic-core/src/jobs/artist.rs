//! Artist job: every album of an artist, one after another.

use std::path::Path;

use crate::catalog::CatalogError;
use crate::sink::Severity;

use super::album::{run_album, AlbumReport, AlbumVerdict};
use super::JobContext;

#[derive(Debug, Clone, Default)]
pub struct ArtistReport {
    pub url: String,
    /// Album addresses found on the artist page.
    pub album_urls: Vec<String>,
    pub albums: Vec<AlbumReport>,
    pub aborted: bool,
}

impl ArtistReport {
    pub fn complete_albums(&self) -> usize {
        self.albums.iter().filter(|a| a.verdict.is_complete()).count()
    }
}

/// Albums run strictly in order; album N+1 starts only after album N's pool
/// drained. Cancellation stops the walk before the next album.
pub fn run_artist(ctx: &JobContext<'_>, url: &str, base_dir: &Path) -> ArtistReport {
    let mut report = ArtistReport {
        url: url.to_string(),
        ..ArtistReport::default()
    };
    if ctx.cancel.is_cancelled() {
        report.aborted = true;
        return report;
    }

    report.album_urls = match ctx.catalog.artist_albums(url) {
        Ok(links) => links,
        Err(CatalogError::Cancelled(_)) => {
            report.aborted = true;
            return report;
        }
        Err(e) => {
            ctx.sink
                .status(Severity::Error, &format!("Unable to get the artist page: {}", e));
            return report;
        }
    };
    ctx.sink.status(
        Severity::Warning,
        &format!(
            "Downloading all {} albums from this artist!",
            report.album_urls.len()
        ),
    );

    for album_url in &report.album_urls {
        if ctx.cancel.is_cancelled() {
            report.aborted = true;
            break;
        }
        tracing::info!(url = %album_url, "album");
        let album = run_album(ctx, album_url, base_dir);
        let aborted = album.verdict == AlbumVerdict::IncompleteAborted;
        report.albums.push(album);
        if aborted {
            report.aborted = true;
            break;
        }
    }

    if !report.aborted {
        ctx.sink.status(Severity::Info, "ARTIST DOWNLOAD FINISHED");
    }
    report
}
