//! Minimal HTTP/1.1 server with Range support for integration tests.
//!
//! Serves a fixed set of paths. GET and POST return the full body (200), or a
//! `206 Partial Content` slice when a `Range: bytes=X-Y` header is present and
//! ranges are enabled for that path. Every request line is recorded.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub body: Vec<u8>,
    pub status: u16,
    pub content_disposition: Option<String>,
    /// If false, Range is ignored and the full body comes back with 200.
    pub support_ranges: bool,
}

impl Route {
    pub fn body(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            status: 200,
            content_disposition: None,
            support_ranges: true,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::body(Vec::new())
        }
    }

    pub fn attachment(mut self, file_name: &str) -> Self {
        self.content_disposition = Some(format!("attachment; filename=\"{}\"", file_name));
        self
    }

    pub fn no_ranges(mut self) -> Self {
        self.support_ranges = false;
        self
    }
}

/// One received request: method, path, and parsed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub range: Option<(u64, u64)>,
}

pub struct RangeServer {
    /// e.g. "http://127.0.0.1:12345"
    pub base: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl RangeServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_path(&self, path: &str) -> Vec<Seen> {
        self.seen().into_iter().filter(|s| s.path == path).collect()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> =
        Arc::new(routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_srv = Arc::clone(&seen);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen_srv);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}", port),
        seen,
    }
}

fn handle(mut stream: std::net::TcpStream, routes: &HashMap<String, Route>, seen: &Mutex<Vec<Seen>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range) = parse_request(request);
    seen.lock().unwrap().push(Seen {
        method: method.to_string(),
        path: path.to_string(),
        range,
    });

    let Some(route) = routes.get(path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };
    if route.status != 200 {
        let head = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            route.status
        );
        let _ = stream.write_all(head.as_bytes());
        return;
    }
    if !(method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("POST")) {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let body = &route.body;
    let total = body.len() as u64;
    let (status, content_range, slice) = match range {
        Some((start, end_incl)) if route.support_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                ("416 Range Not Satisfiable", Some(format!("bytes */{}", total)), &body[0..0])
            } else {
                let slice = &body[start as usize..=end_incl as usize];
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    slice,
                )
            }
        }
        _ => ("200 OK", None, &body[..]),
    };

    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        slice.len()
    );
    if let Some(cr) = content_range {
        head.push_str(&format!("Content-Range: {}\r\n", cr));
    }
    if route.support_ranges {
        head.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(ref cd) = route.content_disposition {
        head.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, path, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut method = "";
    let mut path = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            path = parts.next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, path, range)
}
