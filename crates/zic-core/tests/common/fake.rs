//! Scripted in-memory transport and catalog for engine tests.
//!
//! Resources are keyed by URL. Every body byte handed to the engine is counted,
//! and the number of simultaneously open bodies is tracked, so tests can check
//! wire bytes and concurrency without sockets.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zic_core::catalog::{AlbumDescriptor, Catalog, CatalogError, RootKind, SourceTraits};
use zic_core::transport::{Request, Response, ResponseHeaders, Transport, TransportError};

/// How one URL answers.
#[derive(Debug, Clone)]
pub struct Resource {
    pub body: Vec<u8>,
    pub status: u32,
    /// Advertised Content-Length: `Some(None)` omits it, `None` uses the body size.
    pub length: Option<Option<u64>>,
    pub disposition: Option<String>,
    pub honor_range: bool,
    /// Added to the start reported in Content-Range (the body is unaffected).
    pub range_skew: u64,
    /// Max bytes returned by one read.
    pub read_size: usize,
    /// Pause before every read.
    pub read_delay: Duration,
}

impl Resource {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            status: 200,
            length: None,
            disposition: None,
            honor_range: true,
            range_skew: 0,
            read_size: 64 * 1024,
            read_delay: Duration::ZERO,
        }
    }

    pub fn status(status: u32) -> Self {
        Self {
            status,
            ..Self::new(Vec::new())
        }
    }

    pub fn named(mut self, file_name: &str) -> Self {
        self.disposition = Some(format!("attachment; filename=\"{}\"", file_name));
        self
    }

    pub fn without_length(mut self) -> Self {
        self.length = Some(None);
        self
    }

    pub fn advertising(mut self, length: u64) -> Self {
        self.length = Some(Some(length));
        self
    }

    pub fn ignoring_ranges(mut self) -> Self {
        self.honor_range = false;
        self
    }

    pub fn skewing_ranges(mut self, by: u64) -> Self {
        self.range_skew = by;
        self
    }

    pub fn slow(mut self, read_size: usize, read_delay: Duration) -> Self {
        self.read_size = read_size;
        self.read_delay = read_delay;
        self
    }
}

#[derive(Default)]
struct Counters {
    wire_bytes: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// In-memory [`Transport`].
#[derive(Default)]
pub struct FakeTransport {
    resources: Mutex<HashMap<String, Resource>>,
    /// One-shot replies served before the resource itself.
    queued: Mutex<HashMap<String, VecDeque<Resource>>>,
    requests: Mutex<Vec<Request>>,
    counters: Arc<Counters>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, resource: Resource) {
        self.resources.lock().unwrap().insert(url.to_string(), resource);
    }

    pub fn serve_once(&self, url: &str, resource: Resource) {
        self.queued
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(resource);
    }

    /// Body bytes read by the engine so far, all URLs.
    pub fn wire_bytes(&self) -> u64 {
        self.counters.wire_bytes.load(Ordering::SeqCst)
    }

    /// Most bodies open at the same time.
    pub fn peak_open(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, url: &str) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.url == url).collect()
    }
}

impl Transport for FakeTransport {
    fn open(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(|q| q.pop_front());
        let resource = match queued {
            Some(r) => r,
            None => match self.resources.lock().unwrap().get(&request.url) {
                Some(r) => r.clone(),
                None => return Err(TransportError::Http(404)),
            },
        };
        if !(200..300).contains(&resource.status) {
            return Err(TransportError::Http(resource.status));
        }

        let total = resource.body.len() as u64;
        let (status, data, content_range) = match request.range {
            Some(range) if resource.honor_range => {
                let start = range.start.min(total) as usize;
                let end = range.end.map(|e| (e + 1).min(total)).unwrap_or(total) as usize;
                let slice = resource.body[start..end.max(start)].to_vec();
                let cr = format!(
                    "bytes {}-{}/{}",
                    start as u64 + resource.range_skew,
                    end.saturating_sub(1),
                    total
                );
                (206, slice, Some(cr))
            }
            _ => (resource.status, resource.body.clone(), None),
        };
        let content_length = match resource.length {
            Some(advertised) if status != 206 => advertised,
            _ => Some(data.len() as u64),
        };

        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);
        Ok(Response {
            status,
            headers: ResponseHeaders {
                content_length,
                content_disposition: resource.disposition.clone(),
                content_range,
            },
            body: Box::new(CountingBody {
                data,
                pos: 0,
                read_size: resource.read_size.max(1),
                read_delay: resource.read_delay,
                counters: Arc::clone(&self.counters),
            }),
        })
    }
}

struct CountingBody {
    data: Vec<u8>,
    pos: usize,
    read_size: usize,
    read_delay: Duration,
    counters: Arc<Counters>,
}

impl Read for CountingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }
        let n = buf.len().min(self.read_size).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        self.counters.wire_bytes.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Catalog answering from prepared descriptors.
#[derive(Default)]
pub struct FakeCatalog {
    pub albums: HashMap<String, AlbumDescriptor>,
    pub artists: HashMap<String, Vec<String>>,
    /// Second-hop links: track address -> file address.
    pub song_pages: HashMap<String, String>,
    pub traits: SourceTraits,
    /// Track addresses whose resolution panics.
    pub broken: Vec<String>,
    pub album_fetches: Mutex<Vec<String>>,
}

impl Catalog for FakeCatalog {
    fn kind_of(&self, url: &str) -> Option<RootKind> {
        if self.artists.contains_key(url) {
            Some(RootKind::Artist)
        } else if self.albums.contains_key(url) {
            Some(RootKind::Album)
        } else {
            None
        }
    }

    fn album(&self, url: &str) -> Result<AlbumDescriptor, CatalogError> {
        self.album_fetches.lock().unwrap().push(url.to_string());
        self.albums.get(url).cloned().ok_or(CatalogError::Fetch {
            url: url.to_string(),
            source: TransportError::Http(404),
        })
    }

    fn artist_albums(&self, url: &str) -> Result<Vec<String>, CatalogError> {
        self.artists.get(url).cloned().ok_or(CatalogError::Fetch {
            url: url.to_string(),
            source: TransportError::Http(404),
        })
    }

    fn resolve_track(&self, url: &str) -> Result<String, CatalogError> {
        if self.broken.iter().any(|b| b == url) {
            panic!("resolver crashed on {}", url);
        }
        Ok(self.song_pages.get(url).cloned().unwrap_or_else(|| url.to_string()))
    }

    fn source_traits(&self) -> SourceTraits {
        self.traits.clone()
    }
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
