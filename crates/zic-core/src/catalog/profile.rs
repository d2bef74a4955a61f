//! Per-site extraction rules.

use regex::Regex;

use super::html::absolute;
use super::{AlbumDescriptor, RootKind, SourceTraits, TrackDescriptor};
use crate::naming::{NamingRule, UNKNOWN};

/// Regular expressions describing one catalog site's markup.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Substring of the host name that selects this profile.
    pub host_marker: &'static str,
    artist_url: Regex,
    album_url: Regex,
    album_id: Regex,
    cover: Regex,
    artist: Regex,
    title: Regex,
    year: Regex,
    /// Start of one track row; a row runs until the next start.
    track_block: Regex,
    position: Regex,
    track_link: Regex,
    unavailable: Regex,
    /// Anchor holding the real file link on a per-song page, if the site has them.
    song_file: Option<Regex>,
    href: Regex,
    pub traits: SourceTraits,
}

const YEAR: &str = r#"<time datetime="(\d+)[^"]*" itemprop="datePublished">"#;
const HREF: &str = r#"href="([^"]+)""#;

impl SiteProfile {
    pub fn myzuka() -> Result<Self, regex::Error> {
        Ok(Self {
            host_marker: "myzuka",
            artist_url: Regex::new(r"(?i)/Artist/")?,
            album_url: Regex::new(r"(?i)/Album/")?,
            album_id: Regex::new(r"Album/(\d+)")?,
            cover: Regex::new(r#"<img alt="[^"]*" itemprop="image" src="([^"]+)""#)?,
            artist: Regex::new(
                r#"(?s)<td>Исполнитель:</td>\s*<td>\s*<a [^>]*>(?:\s*<meta [^>]*/?>)*\s*([^<]+?)\s*</a>"#,
            )?,
            title: Regex::new(
                r#"(?s)<span itemprop="title">[^<]*</span>\s*</a>/\s*<span [^>]*itemtype="http://data-vocabulary.org/Breadcrumb"[^>]*>([^<]+)</span>"#,
            )?,
            year: Regex::new(YEAR)?,
            track_block: Regex::new(r#"<div class="position">"#)?,
            position: Regex::new(r#"<div class="position">\s*(\d+)"#)?,
            track_link: Regex::new(r#"<a href="(/Song/[^"]+)""#)?,
            unavailable: Regex::new(r"\[Удален по требованию правообладателя\]")?,
            song_file: Some(Regex::new(r#"<a\s[^>]*itemprop="audio"[^>]*>"#)?),
            href: Regex::new(HREF)?,
            traits: SourceTraits {
                resume_safe: true,
                naming: NamingRule::ServerProvided {
                    strip: Some("_myzuka".to_string()),
                },
            },
        })
    }

    /// Ranged resumes on this site return shifted bytes, so they are disabled,
    /// and its download names come from the URL.
    pub fn musify() -> Result<Self, regex::Error> {
        Ok(Self {
            host_marker: "musify",
            artist_url: Regex::new(r"(?i)/artist/")?,
            album_url: Regex::new(r"(?i)/release/")?,
            album_id: Regex::new(r"release/.+-(\d+)")?,
            cover: Regex::new(r#"<link href="([^"]+)" rel="image_src""#)?,
            artist: Regex::new(
                r#"(?s)title="Исполнитель"[^>]*>\s*</i>\s*<a [^>]*>(?:\s*<meta [^>]*/?>)*\s*([^<]+?)\s*(?:</meta>\s*)*</a>"#,
            )?,
            title: Regex::new(r#"(?s)<li [^>]*class="breadcrumb-item active"[^>]*>([^<]+)</li>"#)?,
            year: Regex::new(YEAR)?,
            track_block: Regex::new(r#"<div class="playlist__item""#)?,
            position: Regex::new(r#"(?:data-position="|<div class="playlist__position">\s*)(\d+)"#)?,
            track_link: Regex::new(r#"data-url="([^"]+\.mp3)""#)?,
            unavailable: Regex::new(r">Недоступен</span>")?,
            song_file: None,
            href: Regex::new(HREF)?,
            traits: SourceTraits {
                resume_safe: false,
                naming: NamingRule::UrlPath,
            },
        })
    }

    pub fn all() -> Result<Vec<Self>, regex::Error> {
        Ok(vec![Self::myzuka()?, Self::musify()?])
    }

    pub fn matches_host(&self, host: &str) -> bool {
        host.to_ascii_lowercase().contains(self.host_marker)
    }

    /// Artist pages are recognized first: an artist address may also contain
    /// album-like path segments.
    pub fn kind_of(&self, url: &str) -> Option<RootKind> {
        if self.artist_url.is_match(url) {
            Some(RootKind::Artist)
        } else if self.album_url.is_match(url) {
            Some(RootKind::Album)
        } else {
            None
        }
    }

    /// Build the album descriptor from an (unescaped) album page.
    pub fn parse_album(&self, page_url: &str, page: &str) -> AlbumDescriptor {
        let artist = first_capture(&self.artist, page).unwrap_or_else(|| {
            tracing::warn!(url = page_url, "unable to get the artist name, using {}", UNKNOWN);
            UNKNOWN.to_string()
        });
        let title = first_capture(&self.title, page).unwrap_or_else(|| {
            tracing::warn!(url = page_url, "unable to get the album name, using {}", UNKNOWN);
            UNKNOWN.to_string()
        });
        let year = first_capture(&self.year, page);
        if year.is_none() {
            tracing::debug!(url = page_url, "no album year");
        }
        let cover_url = first_capture(&self.cover, page).and_then(|c| absolute(page_url, &c));
        AlbumDescriptor {
            artist,
            title,
            year,
            id: first_capture(&self.album_id, page_url).unwrap_or_default(),
            cover_url,
            tracks: self.tracks(page_url, page),
        }
    }

    fn tracks(&self, page_url: &str, page: &str) -> Vec<TrackDescriptor> {
        let starts: Vec<usize> = self.track_block.find_iter(page).map(|m| m.start()).collect();
        let mut tracks = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(page.len());
            let row = &page[start..end];
            let Some(position) = first_capture(&self.position, row).and_then(|p| p.parse::<u32>().ok()) else {
                tracing::debug!(url = page_url, "track row without a position");
                continue;
            };
            let url = if self.unavailable.is_match(row) {
                tracing::warn!(url = page_url, position, "track is missing from the website");
                None
            } else {
                let link = first_capture(&self.track_link, row).and_then(|l| absolute(page_url, &l));
                if link.is_none() {
                    tracing::warn!(url = page_url, position, "unable to get the link of this track");
                }
                link
            };
            tracks.push(TrackDescriptor { position, url });
        }
        tracks
    }

    /// Album addresses linked from an artist page, in page order, without duplicates.
    pub fn album_links(&self, page_url: &str, page: &str) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();
        for caps in self.href.captures_iter(page) {
            let href = &caps[1];
            if !self.album_url.is_match(href) {
                continue;
            }
            if let Some(abs) = absolute(page_url, href) {
                if !links.contains(&abs) {
                    links.push(abs);
                }
            }
        }
        links
    }

    /// Real file link on a per-song page. Sites without song pages return the
    /// address unchanged.
    pub fn song_file_link(&self, page_url: &str, page: &str) -> Option<String> {
        let anchor = self.song_file.as_ref()?.find(page)?;
        let href = first_capture(&self.href, anchor.as_str())?;
        absolute(page_url, &href)
    }

    pub fn has_song_pages(&self) -> bool {
        self.song_file.is_some()
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
