//! libcurl-backed [`Transport`].
//!
//! curl pushes body bytes into a write callback; the engine wants to pull them
//! chunk by chunk so it can poll cancellation between chunks. Each request runs
//! on its own thread and forwards chunks through a bounded channel. The caller
//! blocks until the final response headers are known.

use std::cell::RefCell;
use std::io;
use std::str;
use std::sync::mpsc::{self, SyncSender};
use std::time::Duration;

use curl::easy::Easy;

use super::body::ChannelReader;
use super::parse::{parse_response_head, ResponseHead};
use super::{site_root, Request, Response, Transport, TransportError};
use crate::config::ZicConfig;

/// Chunks buffered between the curl thread and the reader.
const BODY_QUEUE_DEPTH: usize = 16;

/// Connection settings applied to every request.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub user_agent: String,
    /// Connect timeout, and the stall window: a transfer that moves no bytes
    /// for this long is aborted as a timeout.
    pub timeout: Duration,
    /// SOCKS5 proxy `host:port`; hostnames are resolved by the proxy.
    pub socks_proxy: Option<String>,
}

impl CurlOptions {
    pub fn from_config(cfg: &ZicConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            timeout: cfg.timeout(),
            socks_proxy: cfg.socks_proxy.clone(),
        }
    }
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from_config(&ZicConfig::default())
    }
}

/// Production transport using the curl crate (libcurl).
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    opts: CurlOptions,
}

impl CurlTransport {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }
}

impl Transport for CurlTransport {
    fn open(&self, request: &Request) -> Result<Response, TransportError> {
        let (head_tx, head_rx) = mpsc::sync_channel::<Result<ResponseHead, TransportError>>(1);
        let (body_tx, body_rx) = mpsc::sync_channel::<io::Result<Vec<u8>>>(BODY_QUEUE_DEPTH);
        let opts = self.opts.clone();
        let req = request.clone();
        std::thread::Builder::new()
            .name("zic-http".to_string())
            .spawn(move || perform(&opts, &req, head_tx, body_tx))
            .map_err(|e| TransportError::Worker(e.to_string()))?;

        let head = head_rx
            .recv()
            .map_err(|_| TransportError::Worker("exited before the response headers".to_string()))??;
        tracing::trace!(url = %request.url, status = head.status, "response headers");
        if !(200..300).contains(&head.status) {
            // Dropping body_rx here aborts the transfer thread.
            return Err(TransportError::Http(head.status));
        }
        Ok(Response {
            status: head.status,
            headers: head.headers,
            body: Box::new(ChannelReader::new(body_rx)),
        })
    }
}

fn configure(easy: &mut Easy, opts: &CurlOptions, request: &Request) -> Result<(), curl::Error> {
    easy.url(&request.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.useragent(&opts.user_agent)?;
    if let Some(root) = site_root(&request.url) {
        easy.referer(&root)?;
    }
    easy.connect_timeout(opts.timeout)?;
    // Stall detection rather than a wall-clock cap: tracks can be large.
    easy.low_speed_limit(1)?;
    easy.low_speed_time(opts.timeout)?;
    if let Some(ref proxy) = opts.socks_proxy {
        easy.proxy(&format!("socks5h://{}", proxy))?;
    }
    if let Some(range) = request.range {
        easy.range(&range.spec())?;
    }
    if let Some(ref body) = request.body {
        easy.post(true)?;
        easy.post_fields_copy(body)?;
    }
    Ok(())
}

/// Runs one transfer on the current thread, reporting headers through `head_tx`
/// and body chunks through `body_tx`.
fn perform(
    opts: &CurlOptions,
    request: &Request,
    head_tx: SyncSender<Result<ResponseHead, TransportError>>,
    body_tx: SyncSender<io::Result<Vec<u8>>>,
) {
    let mut easy = Easy::new();
    if let Err(e) = configure(&mut easy, opts, request) {
        let _ = head_tx.send(Err(TransportError::Curl(e)));
        return;
    }

    let lines: RefCell<Vec<String>> = RefCell::new(Vec::new());
    let head_tx = RefCell::new(Some(head_tx));
    let send_head = || {
        if let Some(tx) = head_tx.borrow_mut().take() {
            let _ = tx.send(Ok(parse_response_head(&lines.borrow())));
        }
    };

    let outcome = (|| -> Result<(), curl::Error> {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                if line.starts_with("HTTP/") {
                    lines.borrow_mut().clear();
                }
                if !line.is_empty() {
                    lines.borrow_mut().push(line.to_string());
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            send_head();
            match body_tx.send(Ok(data.to_vec())) {
                Ok(()) => Ok(data.len()),
                // Reader dropped: abort.
                Err(_) => Ok(0),
            }
        })?;
        transfer.perform()
    })();

    match outcome {
        Ok(()) => send_head(),
        Err(e) => {
            if let Some(tx) = head_tx.borrow_mut().take() {
                let _ = tx.send(Err(TransportError::Curl(e)));
            } else if !e.is_write_error() {
                let kind = if e.is_operation_timedout() {
                    io::ErrorKind::TimedOut
                } else {
                    io::ErrorKind::ConnectionReset
                };
                let _ = body_tx.send(Err(io::Error::new(kind, e.to_string())));
            }
        }
    }
}
