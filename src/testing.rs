//! Test doubles shared by the unit tests: a local HTTP stub for the catalog
//! client and a scripted in-process catalog for the feed machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::data::{CatalogError, CatalogService, Comment, CommentService, FeedPage, VideoSummary};
use crate::youtube::CommentOrder;

pub struct StubServer {
    server: Arc<tiny_http::Server>,
    hits: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<()>>,
    port: u16,
}

impl StubServer {
    /// Serves every request with `handler(url)`, which returns a status and a JSON body.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let server = Arc::new(tiny_http::Server::http("127.0.0.1:0").expect("bind stub server"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("stub server ip address")
            .port();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let worker_server = server.clone();
        let worker_hits = hits.clone();
        let handle = thread::spawn(move || {
            for request in worker_server.incoming_requests() {
                let url = request.url().to_string();
                worker_hits.lock().push(url.clone());
                let (status, body) = handler(&url);
                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"application/json"[..],
                )
                .expect("static header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            server,
            hits,
            handle: Some(handle),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: &'static str,
    pub arg: String,
    pub token: Option<String>,
}

type Responder = dyn Fn(&Call) -> Result<FeedPage, CatalogError> + Send + Sync;

/// Catalog whose answers come from a closure. Calls of a held kind block until
/// the matching release sender fires once per call.
pub struct StubCatalog {
    responder: Box<Responder>,
    calls: Mutex<Vec<Call>>,
    gates: Mutex<HashMap<&'static str, Receiver<()>>>,
}

impl StubCatalog {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&Call) -> Result<FeedPage, CatalogError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn hold(&self, kind: &'static str) -> Sender<()> {
        let (tx, rx) = unbounded();
        self.gates.lock().insert(kind, rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn answer(&self, call: Call) -> Result<FeedPage, CatalogError> {
        self.calls.lock().push(call.clone());
        let gate = self.gates.lock().get(call.kind).cloned();
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        (self.responder)(&call)
    }
}

impl CatalogService for StubCatalog {
    fn fetch_trending(&self, page_token: Option<&str>) -> Result<FeedPage, CatalogError> {
        self.answer(Call {
            kind: "trending",
            arg: String::new(),
            token: page_token.map(str::to_string),
        })
    }

    fn fetch_by_query(&self, query: &str, page_token: Option<&str>) -> Result<FeedPage, CatalogError> {
        if query.trim().is_empty() {
            return Err(CatalogError::InvalidArgument("search query is empty".into()));
        }
        self.answer(Call {
            kind: "search",
            arg: query.to_string(),
            token: page_token.map(str::to_string),
        })
    }

    fn fetch_by_id(&self, id: &str) -> Result<VideoSummary, CatalogError> {
        let page = self.answer(Call {
            kind: "video",
            arg: id.to_string(),
            token: None,
        })?;
        page.items
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    fn fetch_shorts(&self, page_token: Option<&str>) -> Result<FeedPage, CatalogError> {
        self.answer(Call {
            kind: "shorts",
            arg: String::new(),
            token: page_token.map(str::to_string),
        })
    }

    fn fetch_channel(&self, channel_id: &str, page_token: Option<&str>) -> Result<FeedPage, CatalogError> {
        self.answer(Call {
            kind: "channel",
            arg: channel_id.to_string(),
            token: page_token.map(str::to_string),
        })
    }
}

impl CommentService for StubCatalog {
    fn load_comments(&self, video_id: &str, order: CommentOrder) -> Result<Vec<Comment>, CatalogError> {
        let page = self.answer(Call {
            kind: "comments",
            arg: video_id.to_string(),
            token: Some(order.as_str().to_string()),
        })?;
        Ok(page
            .items
            .into_iter()
            .map(|video| Comment {
                id: video.id,
                author: video.channel_title,
                text: video.title,
                ..Comment::default()
            })
            .collect())
    }
}

pub fn video(id: &str) -> VideoSummary {
    VideoSummary {
        id: id.to_string(),
        title: format!("Video {id}"),
        channel_title: "Channel".to_string(),
        channel_id: "UC123".to_string(),
        ..VideoSummary::default()
    }
}

pub fn page(prefix: &str, range: std::ops::RangeInclusive<usize>, next: Option<&str>) -> FeedPage {
    FeedPage {
        items: range.map(|n| video(&format!("{prefix}{n}"))).collect(),
        next_page_token: next.map(str::to_string),
    }
}

pub fn ids(items: &[VideoSummary]) -> Vec<&str> {
    items.iter().map(|video| video.id.as_str()).collect()
}

/// Spins until `check` holds or the deadline passes.
pub fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}
