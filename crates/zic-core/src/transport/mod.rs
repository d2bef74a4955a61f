//! HTTP transport seam.
//!
//! The engine talks to the network only through [`Transport`]: one request in,
//! status + key headers + a pull-style body out, or a classified error.
//! [`CurlTransport`] is the production implementation; tests script their own.

mod body;
mod error;
mod libcurl;
mod parse;

use std::io::Read;

pub use body::ChannelReader;
pub use error::TransportError;
pub use libcurl::{CurlOptions, CurlTransport};
pub use parse::{parse_response_head, ResponseHead, ResponseHeaders};

/// Inclusive byte range for a `Range: bytes=start-end` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Last byte wanted (inclusive); None = to the end of the resource.
    pub end: Option<u64>,
}

impl ByteRange {
    /// Range covering `[start, total)`.
    pub fn resume(start: u64, total: u64) -> Self {
        Self {
            start,
            end: Some(total.saturating_sub(1)),
        }
    }

    /// Value in the form curl expects ("start-end", no `bytes=` prefix).
    pub fn spec(&self) -> String {
        match self.end {
            Some(end) => format!("{}-{}", self.start, end),
            None => format!("{}-", self.start),
        }
    }
}

/// One HTTP request. A body turns it into a POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub range: Option<ByteRange>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            range: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
            range: None,
        }
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Successful (2xx) response with its body still on the wire.
pub struct Response {
    pub status: u32,
    pub headers: ResponseHeaders,
    pub body: Box<dyn Read + Send>,
}

impl Response {
    /// True for `206 Partial Content`: the server honored the Range header.
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs one HTTP request. Non-2xx statuses come back as `TransportError::Http`.
pub trait Transport: Send + Sync {
    fn open(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Fetch a whole page as text (lossy UTF-8).
pub fn fetch_text(transport: &dyn Transport, request: &Request) -> Result<String, TransportError> {
    let mut response = transport.open(request)?;
    let mut raw = Vec::new();
    response
        .body
        .read_to_end(&mut raw)
        .map_err(TransportError::Body)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// `scheme://host[:port]` of an absolute URL.
pub fn site_root(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_range_spec() {
        assert_eq!(ByteRange::resume(500, 1000).spec(), "500-999");
        let open = ByteRange {
            start: 10,
            end: None,
        };
        assert_eq!(open.spec(), "10-");
    }

    #[test]
    fn request_builders() {
        let r = Request::get("http://a/x").with_range(ByteRange::resume(1, 3));
        assert!(r.body.is_none());
        assert_eq!(r.range.unwrap().spec(), "1-2");
        let p = Request::post("http://a/artist", Vec::new());
        assert_eq!(p.body.as_deref(), Some(&[][..]));
    }

    #[test]
    fn site_root_keeps_scheme_host_port() {
        assert_eq!(
            site_root("https://myzuka.club/Album/630746/x").as_deref(),
            Some("https://myzuka.club")
        );
        assert_eq!(
            site_root("http://127.0.0.1:8080/a/b").as_deref(),
            Some("http://127.0.0.1:8080")
        );
        assert!(site_root("not a url").is_none());
    }
}
