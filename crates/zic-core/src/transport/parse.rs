//! Parse HTTP response header lines into a status and the headers the engine uses.

/// Headers the transfer engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// Body size in bytes, if `Content-Length` is present and numeric.
    pub content_length: Option<u64>,
    /// Raw `Content-Disposition` value (filename hint).
    pub content_disposition: Option<String>,
    /// Raw `Content-Range` value (present on 206 replies).
    pub content_range: Option<String>,
}

/// Status code plus parsed headers of the final response (after redirects).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    pub headers: ResponseHeaders,
}

/// Parse collected header lines. Lines from earlier responses in a redirect
/// chain are ignored: parsing restarts at every status line.
pub fn parse_response_head(lines: &[String]) -> ResponseHead {
    let mut head = ResponseHead::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            head = ResponseHead {
                status: parse_status_line(line).unwrap_or(0),
                headers: ResponseHeaders::default(),
            };
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                head.headers.content_length = value.parse::<u64>().ok();
            }
            if name.eq_ignore_ascii_case("content-disposition") {
                head.headers.content_disposition = Some(value.to_string());
            }
            if name.eq_ignore_ascii_case("content-range") {
                head.headers.content_range = Some(value.to_string());
            }
        }
    }

    head
}

/// `HTTP/1.1 206 Partial Content` -> 206.
fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}
