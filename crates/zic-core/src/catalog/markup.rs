use std::sync::Arc;

use super::html::unescape;
use super::{AlbumDescriptor, Catalog, CatalogError, RootKind, SiteProfile, SourceTraits};
use crate::cancel::{CancelToken, Cancelled};
use crate::retry::{classify_transport, run_with_retry, RetryError, RetryPolicy};
use crate::transport::{fetch_text, Request, Transport};

/// Scrapes a supported site with a [`SiteProfile`].
pub struct MarkupCatalog {
    profile: SiteProfile,
    transport: Arc<dyn Transport>,
    cancel: CancelToken,
    retry: RetryPolicy,
}

impl MarkupCatalog {
    pub fn new(profile: SiteProfile, transport: Arc<dyn Transport>, cancel: CancelToken, retry: RetryPolicy) -> Self {
        Self {
            profile,
            transport,
            cancel,
            retry,
        }
    }

    /// Fetch and unescape a page, retrying transient failures.
    fn page(&self, request: Request) -> Result<String, CatalogError> {
        let text = run_with_retry(&self.retry, &self.cancel, classify_transport, || {
            fetch_text(self.transport.as_ref(), &request)
        })
        .map_err(|e| match e {
            RetryError::Cancelled => CatalogError::Cancelled(Cancelled),
            RetryError::Failed(source) => CatalogError::Fetch {
                url: request.url.clone(),
                source,
            },
        })?;
        Ok(unescape(&text))
    }
}

impl Catalog for MarkupCatalog {
    fn kind_of(&self, url: &str) -> Option<RootKind> {
        self.profile.kind_of(url)
    }

    fn album(&self, url: &str) -> Result<AlbumDescriptor, CatalogError> {
        let page = self.page(Request::get(url))?;
        Ok(self.profile.parse_album(url, &page))
    }

    /// Artist pages are requested with an empty POST body.
    fn artist_albums(&self, url: &str) -> Result<Vec<String>, CatalogError> {
        let page = self.page(Request::post(url, Vec::new()))?;
        Ok(self.profile.album_links(url, &page))
    }

    fn resolve_track(&self, url: &str) -> Result<String, CatalogError> {
        if !self.profile.has_song_pages() {
            return Ok(url.to_string());
        }
        let page = self.page(Request::get(url))?;
        self.profile
            .song_file_link(url, &page)
            .ok_or_else(|| CatalogError::NoFileLink(url.to_string()))
    }

    fn source_traits(&self) -> SourceTraits {
        self.profile.traits.clone()
    }
}
