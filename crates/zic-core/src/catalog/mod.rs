//! Catalog adapters: turn a site's pages into album/track descriptors.
//!
//! The engine only sees the [`Catalog`] trait. [`MarkupCatalog`] implements it
//! for the supported sites from a [`SiteProfile`] of regular expressions.

mod html;
mod markup;
mod profile;

pub use html::{absolute, unescape};
pub use markup::MarkupCatalog;
pub use profile::SiteProfile;

use std::sync::Arc;

use crate::cancel::{CancelToken, Cancelled};
use crate::naming::NamingRule;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError};

/// One track slot of an album. `url` is None when the site lists the track but
/// no longer serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub position: u32,
    pub url: Option<String>,
}

impl TrackDescriptor {
    pub fn available(position: u32, url: impl Into<String>) -> Self {
        Self {
            position,
            url: Some(url.into()),
        }
    }

    pub fn unavailable(position: u32) -> Self {
        Self { position, url: None }
    }

    pub fn is_available(&self) -> bool {
        self.url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumDescriptor {
    pub artist: String,
    pub title: String,
    pub year: Option<String>,
    /// Site's album id (may be empty).
    pub id: String,
    pub cover_url: Option<String>,
    pub tracks: Vec<TrackDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Artist,
    Album,
}

/// Source behavior the Transfer Unit must respect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTraits {
    /// False when the site corrupts ranged resumes.
    pub resume_safe: bool,
    pub naming: NamingRule,
}

impl Default for SourceTraits {
    fn default() -> Self {
        Self {
            resume_safe: true,
            naming: NamingRule::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to recognize {0}: expected an artist or album page of a supported site")]
    Unrecognized(String),
    #[error("unable to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("no audio link on song page {0}")]
    NoFileLink(String),
    #[error("invalid site profile: {0}")]
    Profile(#[from] regex::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

pub trait Catalog: Send + Sync {
    fn kind_of(&self, url: &str) -> Option<RootKind>;

    fn album(&self, url: &str) -> Result<AlbumDescriptor, CatalogError>;

    /// Album addresses of an artist, absolute, in page order, de-duplicated.
    fn artist_albums(&self, url: &str) -> Result<Vec<String>, CatalogError>;

    /// Direct file link for a track address.
    fn resolve_track(&self, url: &str) -> Result<String, CatalogError> {
        Ok(url.to_string())
    }

    fn source_traits(&self) -> SourceTraits;
}

/// Pick the adapter for a root address by its host name.
pub fn catalog_for(
    url: &str,
    transport: Arc<dyn Transport>,
    cancel: CancelToken,
    retry: RetryPolicy,
) -> Result<MarkupCatalog, CatalogError> {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| CatalogError::Unrecognized(url.to_string()))?;
    let profile = SiteProfile::all()?
        .into_iter()
        .find(|p| p.matches_host(&host))
        .ok_or_else(|| CatalogError::Unrecognized(url.to_string()))?;
    tracing::debug!(host = %host, site = profile.host_marker, "catalog selected");
    Ok(MarkupCatalog::new(profile, transport, cancel, retry))
}
