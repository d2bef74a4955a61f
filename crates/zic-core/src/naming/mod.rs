//! File and directory naming.
//!
//! Track files get the server's name (or the URL's last path segment) with a
//! position prefix; covers get one fixed name; album directories are built from
//! the descriptor. Every name is sanitized so it stays inside the album directory.

mod disposition;
mod sanitize;

pub use disposition::{disposition_filename, percent_decode};
pub use sanitize::{sanitize_dir_name, sanitize_file_name};

use crate::catalog::AlbumDescriptor;

/// Placeholder when the catalog page lacks an artist or a title.
pub const UNKNOWN: &str = "Unknown";

/// Where a track's file name comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingRule {
    /// `Content-Disposition` filename, minus an optional site watermark suffix
    /// (e.g. `_myzuka` before the extension). Falls back to the URL path.
    ServerProvided { strip: Option<String> },
    /// Last path segment of the download URL, percent-decoded.
    UrlPath,
}

impl Default for NamingRule {
    fn default() -> Self {
        NamingRule::ServerProvided { strip: None }
    }
}

/// Last path segment of `url`, percent-decoded. None for an empty path.
pub fn url_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(last);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// True when the name already starts with a track number (`07_x`, `7-x`).
fn has_position_prefix(name: &str) -> bool {
    let digits = name.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    let mut rest = name[digits..].chars();
    matches!(rest.next(), Some('-') | Some('_')) && rest.next().is_some()
}

/// Zero-padded position, at least two digits.
pub fn position_label(position: u32) -> String {
    format!("{:02}", position)
}

/// Final on-disk name for a track, or None if neither the server nor the URL
/// offers one.
pub fn track_file_name(
    rule: &NamingRule,
    position: u32,
    url: &str,
    content_disposition: Option<&str>,
) -> Option<String> {
    let raw = match rule {
        NamingRule::ServerProvided { strip } => {
            let from_server = content_disposition.and_then(disposition_filename);
            let name = from_server.or_else(|| {
                tracing::debug!(url, "no filename from server, using URL path");
                url_file_name(url)
            })?;
            match strip {
                Some(s) if !s.is_empty() => name.replace(s.as_str(), ""),
                _ => name,
            }
        }
        NamingRule::UrlPath => url_file_name(url)?,
    };
    let clean = sanitize_file_name(&raw);
    if clean.is_empty() {
        return None;
    }
    if has_position_prefix(&clean) {
        Some(clean)
    } else {
        Some(format!("{}_{}", position_label(position), clean))
    }
}

/// Directory name for an album: `[id - ]Artist - Title[ (Year)]`, sanitized.
pub fn album_dir_name(album: &AlbumDescriptor, with_album_id: bool) -> String {
    let artist = non_blank(&album.artist).unwrap_or(UNKNOWN);
    let title = non_blank(&album.title).unwrap_or(UNKNOWN);
    let mut name = String::new();
    if with_album_id {
        if let Some(id) = non_blank(&album.id) {
            name.push_str(id);
            name.push_str(" - ");
        }
    }
    name.push_str(artist);
    name.push_str(" - ");
    name.push_str(title);
    if let Some(year) = album.year.as_deref().and_then(non_blank) {
        name.push_str(&format!(" ({})", year));
    }
    sanitize_dir_name(&name)
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}
