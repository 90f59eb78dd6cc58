//! Paginated video collections.
//!
//! A [`Feed`] owns one list of videos for one [`FeedMode`]. Page requests run
//! on worker threads and report back over a channel; the owner drains that
//! channel with [`Feed::poll`] from its event loop, so every state transition
//! happens on the owning thread. Only one request per generation is ever in
//! flight, and responses tagged with an older generation are dropped.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::data::{CatalogError, CatalogService, FeedPage, VideoSummary};

/// How close to the end of the list the selection may get before the next
/// page is requested.
pub const NEAR_END_THRESHOLD: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedMode {
    Trending,
    Search(String),
    Shorts,
    Channel(String),
}

impl FeedMode {
    pub fn label(&self) -> String {
        match self {
            FeedMode::Trending => "Trending".to_string(),
            FeedMode::Search(query) => format!("Search: {query}"),
            FeedMode::Shorts => "Shorts".to_string(),
            FeedMode::Channel(id) => format!("Channel {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadingFirst,
    Ready,
    LoadingNext,
    Exhausted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    Replace,
    Append,
}

struct PendingPage {
    generation: u64,
    load: LoadMode,
}

struct PageResponse {
    generation: u64,
    result: Result<FeedPage, CatalogError>,
}

pub struct Feed {
    service: Arc<dyn CatalogService>,
    mode: Option<FeedMode>,
    items: Vec<VideoSummary>,
    continuation_token: Option<String>,
    phase: Phase,
    error: Option<CatalogError>,
    failed_load: Option<LoadMode>,
    generation: u64,
    pending: Option<PendingPage>,
    requests_issued: u64,
    stale_discarded: u64,
    response_tx: Sender<PageResponse>,
    response_rx: Receiver<PageResponse>,
}

impl Feed {
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            service,
            mode: None,
            items: Vec::new(),
            continuation_token: None,
            phase: Phase::Idle,
            error: None,
            failed_load: None,
            generation: 0,
            pending: None,
            requests_issued: 0,
            stale_discarded: 0,
            response_tx,
            response_rx,
        }
    }

    pub fn mode(&self) -> Option<&FeedMode> {
        self.mode.as_ref()
    }

    pub fn items(&self) -> &[VideoSummary] {
        &self.items
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&CatalogError> {
        self.error.as_ref()
    }

    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }

    pub fn is_loading_first_page(&self) -> bool {
        self.phase == Phase::LoadingFirst
    }

    pub fn is_loading_next_page(&self) -> bool {
        self.phase == Phase::LoadingNext
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    /// Starts over in `mode`. Ignored while a request for the same mode is in
    /// flight; a different mode supersedes whatever is still outstanding.
    pub fn reset(&mut self, mode: FeedMode) -> bool {
        if self.pending.is_some() && self.mode.as_ref() == Some(&mode) {
            debug!(mode = %mode.label(), "reset ignored: request in flight");
            return false;
        }

        self.generation = self.generation.wrapping_add(1);
        self.items.clear();
        self.continuation_token = None;
        self.error = None;
        self.failed_load = None;
        self.mode = Some(mode);
        self.phase = Phase::LoadingFirst;
        self.dispatch(None, LoadMode::Replace);
        true
    }

    /// Requests the page after the last one received. Only acts from `Ready`
    /// with a continuation token.
    pub fn load_next(&mut self) -> bool {
        if self.phase != Phase::Ready || self.pending.is_some() {
            return false;
        }
        let Some(token) = self.continuation_token.clone() else {
            return false;
        };

        self.phase = Phase::LoadingNext;
        self.dispatch(Some(token), LoadMode::Append);
        true
    }

    /// Re-issues the step that failed. Items loaded before the failure stay.
    pub fn retry(&mut self) -> bool {
        if self.phase != Phase::Error {
            return false;
        }
        match (self.failed_load, self.continuation_token.clone()) {
            (Some(LoadMode::Append), Some(token)) => {
                self.error = None;
                self.failed_load = None;
                self.phase = Phase::LoadingNext;
                self.dispatch(Some(token), LoadMode::Append);
                true
            }
            _ => match self.mode.clone() {
                Some(mode) => self.reset(mode),
                None => false,
            },
        }
    }

    /// Near-end-of-list signal from a view. `selected` is the index of the
    /// focused item.
    pub fn near_end(&mut self, selected: usize) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let remaining = self
            .items
            .len()
            .saturating_sub(selected.saturating_add(1));
        if remaining > NEAR_END_THRESHOLD {
            return false;
        }
        self.load_next()
    }

    /// Applies every response that has already arrived. Never blocks.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.response_rx.try_recv() {
            changed |= self.apply(response);
        }
        changed
    }

    /// Blocks until the in-flight request settles or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut changed = false;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => changed |= self.apply(response),
                Err(_) => break,
            }
        }
        changed
    }

    fn dispatch(&mut self, page_token: Option<String>, load: LoadMode) {
        let Some(mode) = self.mode.clone() else {
            return;
        };
        let generation = self.generation;
        self.pending = Some(PendingPage { generation, load });
        self.requests_issued = self.requests_issued.wrapping_add(1);
        debug!(
            mode = %mode.label(),
            generation,
            append = load == LoadMode::Append,
            "requesting feed page"
        );

        let tx = self.response_tx.clone();
        let service = self.service.clone();
        thread::spawn(move || {
            let result = fetch_page(service.as_ref(), &mode, page_token.as_deref());
            let _ = tx.send(PageResponse { generation, result });
        });
    }

    fn apply(&mut self, response: PageResponse) -> bool {
        let Some(pending) = &self.pending else {
            self.stale_discarded += 1;
            return false;
        };
        if pending.generation != response.generation || response.generation != self.generation {
            debug!(
                generation = response.generation,
                current = self.generation,
                "discarding stale feed page"
            );
            self.stale_discarded += 1;
            return false;
        }
        let load = pending.load;
        self.pending = None;

        match response.result {
            Ok(page) => {
                match load {
                    LoadMode::Replace => self.items = page.items,
                    LoadMode::Append => self.items.extend(page.items),
                }
                self.continuation_token = page
                    .next_page_token
                    .filter(|token| !token.trim().is_empty());
                self.phase = if self.continuation_token.is_some() {
                    Phase::Ready
                } else {
                    Phase::Exhausted
                };
            }
            Err(err) => {
                warn!(error = %err, "feed page failed");
                self.error = Some(err);
                self.failed_load = Some(load);
                self.phase = Phase::Error;
            }
        }
        true
    }
}

pub fn fetch_page(
    service: &dyn CatalogService,
    mode: &FeedMode,
    page_token: Option<&str>,
) -> Result<FeedPage, CatalogError> {
    match mode {
        FeedMode::Trending => service.fetch_trending(page_token),
        FeedMode::Search(query) => service.fetch_by_query(query, page_token),
        FeedMode::Shorts => service.fetch_shorts(page_token),
        FeedMode::Channel(channel_id) => service.fetch_channel(channel_id, page_token),
    }
}

/// One-at-a-time cursor over the shorts feed.
pub struct ShortsDeck {
    feed: Feed,
    current: usize,
}

impl ShortsDeck {
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        Self {
            feed: Feed::new(service),
            current: 0,
        }
    }

    pub fn load(&mut self) -> bool {
        let started = self.feed.reset(FeedMode::Shorts);
        if started {
            self.current = 0;
        }
        started
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut Feed {
        &mut self.feed
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&VideoSummary> {
        self.feed.items().get(self.current)
    }

    pub fn next(&mut self) -> bool {
        let moved = self.current + 1 < self.feed.items().len();
        if moved {
            self.current += 1;
        }
        self.feed.near_end(self.current);
        moved
    }

    pub fn prev(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eventually, ids, page, StubCatalog};
    use std::sync::atomic::{AtomicBool, Ordering};

    const SETTLE: Duration = Duration::from_secs(5);

    fn trending_two_pages() -> Arc<StubCatalog> {
        StubCatalog::new(|call| match (call.kind, call.token.as_deref()) {
            ("trending", None) => Ok(page("v", 1..=24, Some("T1"))),
            ("trending", Some("T1")) => Ok(page("v", 25..=48, None)),
            ("search", None) => Ok(page(&format!("{}-", call.arg), 1..=3, Some("S1"))),
            _ => Ok(FeedPage::default()),
        })
    }

    #[test]
    fn starts_idle() {
        let feed = Feed::new(trending_two_pages());
        assert_eq!(feed.phase(), Phase::Idle);
        assert!(feed.items().is_empty());
        assert!(feed.mode().is_none());
    }

    #[test]
    fn trending_pages_through_to_exhaustion() {
        let stub = trending_two_pages();
        let mut feed = Feed::new(stub.clone());

        assert!(feed.reset(FeedMode::Trending));
        assert!(feed.is_loading_first_page());
        assert!(!feed.is_loading_next_page());
        feed.wait(SETTLE);
        assert_eq!(feed.phase(), Phase::Ready);
        assert_eq!(feed.items().len(), 24);
        assert_eq!(feed.continuation_token(), Some("T1"));

        assert!(feed.load_next());
        assert!(feed.is_loading_next_page());
        assert!(!feed.is_loading_first_page());
        feed.wait(SETTLE);
        assert_eq!(feed.phase(), Phase::Exhausted);
        assert_eq!(feed.items().len(), 48);
        assert_eq!(feed.items()[0].id, "v1");
        assert_eq!(feed.items()[47].id, "v48");

        assert!(!feed.load_next());
        assert_eq!(feed.requests_issued(), 2);
        assert_eq!(stub.calls().len(), 2);
    }

    #[test]
    fn appends_without_reordering_or_dedup() {
        let stub = StubCatalog::new(|call| match call.token.as_deref() {
            None => Ok(page("x", 0..=0, Some("A"))),
            Some("A") => Ok(crate::data::FeedPage {
                items: vec![crate::testing::video("a"), crate::testing::video("b")],
                next_page_token: Some("B".into()),
            }),
            Some("B") => Ok(crate::data::FeedPage {
                items: vec![crate::testing::video("c"), crate::testing::video("a")],
                next_page_token: Some("C".into()),
            }),
            _ => Ok(FeedPage::default()),
        });
        let mut feed = Feed::new(stub);
        feed.reset(FeedMode::Trending);
        feed.wait(SETTLE);
        feed.load_next();
        feed.wait(SETTLE);
        feed.load_next();
        feed.wait(SETTLE);
        assert_eq!(ids(feed.items()), vec!["x0", "a", "b", "c", "a"]);
        assert_eq!(feed.phase(), Phase::Ready);
    }

    #[test]
    fn overlapping_triggers_issue_a_single_request() {
        let stub = trending_two_pages();
        let release = stub.hold("trending");
        let mut feed = Feed::new(stub.clone());

        assert!(feed.reset(FeedMode::Trending));
        for _ in 0..5 {
            assert!(!feed.load_next());
            assert!(!feed.near_end(0));
        }
        assert!(!feed.reset(FeedMode::Trending));
        assert_eq!(feed.requests_issued(), 1);

        release.send(()).unwrap();
        feed.wait(SETTLE);
        assert_eq!(feed.phase(), Phase::Ready);

        assert!(feed.load_next());
        for _ in 0..5 {
            assert!(!feed.load_next());
            assert!(!feed.near_end(23));
        }
        release.send(()).unwrap();
        feed.wait(SETTLE);

        assert_eq!(feed.requests_issued(), 2);
        assert_eq!(stub.calls().len(), 2);
        assert_eq!(feed.items().len(), 48);
    }

    #[test]
    fn mode_switch_discards_late_response() {
        let stub = trending_two_pages();
        let release_trending = stub.hold("trending");
        let mut feed = Feed::new(stub.clone());

        feed.reset(FeedMode::Trending);
        let first_generation = feed.generation();
        assert!(feed.reset(FeedMode::Search("rust".into())));
        assert_eq!(feed.generation(), first_generation + 1);
        feed.wait(SETTLE);
        assert_eq!(ids(feed.items()), vec!["rust-1", "rust-2", "rust-3"]);

        release_trending.send(()).unwrap();
        assert!(eventually(|| {
            feed.poll();
            feed.stale_discarded() == 1
        }));
        assert_eq!(ids(feed.items()), vec!["rust-1", "rust-2", "rust-3"]);
        assert_eq!(feed.mode(), Some(&FeedMode::Search("rust".into())));
        assert_eq!(feed.continuation_token(), Some("S1"));
        assert_eq!(feed.phase(), Phase::Ready);
    }

    #[test]
    fn mode_switch_during_next_page_discards_the_append() {
        let stub = trending_two_pages();
        let mut feed = Feed::new(stub.clone());
        feed.reset(FeedMode::Trending);
        feed.wait(SETTLE);
        assert_eq!(feed.items().len(), 24);

        let release_trending = stub.hold("trending");
        assert!(feed.load_next());
        assert!(feed.is_loading_next_page());
        let appending_generation = feed.generation();

        assert!(feed.reset(FeedMode::Search("s".into())));
        assert_eq!(feed.generation(), appending_generation + 1);
        assert!(feed.is_loading_first_page());
        assert!(!feed.is_loading_next_page());
        feed.wait(SETTLE);
        assert_eq!(ids(feed.items()), vec!["s-1", "s-2", "s-3"]);

        release_trending.send(()).unwrap();
        assert!(eventually(|| {
            feed.poll();
            feed.stale_discarded() == 1
        }));
        assert_eq!(ids(feed.items()), vec!["s-1", "s-2", "s-3"]);
        assert_eq!(feed.continuation_token(), Some("S1"));
        assert_eq!(feed.phase(), Phase::Ready);
        assert_eq!(stub.calls().len(), 3);
    }

    #[test]
    fn load_next_without_token_is_a_no_op() {
        let stub = StubCatalog::new(|_| Ok(page("only", 1..=2, None)));
        let mut feed = Feed::new(stub.clone());
        assert!(!feed.load_next());

        feed.reset(FeedMode::Trending);
        feed.wait(SETTLE);
        assert!(feed.is_exhausted());
        assert!(!feed.load_next());
        assert!(!feed.near_end(1));
        assert_eq!(stub.calls().len(), 1);
        assert_eq!(feed.phase(), Phase::Exhausted);
    }

    #[test]
    fn failed_next_page_keeps_items_and_retries() {
        let failing = Arc::new(AtomicBool::new(true));
        let flag = failing.clone();
        let stub = StubCatalog::new(move |call| match call.token.as_deref() {
            None => Ok(page("v", 1..=3, Some("T1"))),
            Some(_) if flag.load(Ordering::SeqCst) => {
                Err(CatalogError::Upstream("HTTP 500".into()))
            }
            Some(_) => Ok(page("v", 4..=5, None)),
        });
        let mut feed = Feed::new(stub.clone());
        feed.reset(FeedMode::Trending);
        feed.wait(SETTLE);
        feed.load_next();
        feed.wait(SETTLE);

        assert_eq!(feed.phase(), Phase::Error);
        assert_eq!(feed.error(), Some(&CatalogError::Upstream("HTTP 500".into())));
        assert_eq!(feed.items().len(), 3);
        assert!(!feed.load_next());

        failing.store(false, Ordering::SeqCst);
        assert!(feed.retry());
        assert!(feed.is_loading_next_page());
        feed.wait(SETTLE);
        assert_eq!(ids(feed.items()), vec!["v1", "v2", "v3", "v4", "v5"]);
        assert!(feed.error().is_none());
        assert_eq!(stub.calls()[2].token.as_deref(), Some("T1"));
    }

    #[test]
    fn config_error_on_first_page_recovers_through_reset() {
        let configured = Arc::new(AtomicBool::new(false));
        let flag = configured.clone();
        let stub = StubCatalog::new(move |_| {
            if flag.load(Ordering::SeqCst) {
                Ok(page("v", 1..=2, None))
            } else {
                Err(CatalogError::Config("no key".into()))
            }
        });
        let mut feed = Feed::new(stub);
        feed.reset(FeedMode::Trending);
        feed.wait(SETTLE);
        assert!(feed.error().is_some_and(CatalogError::is_config));

        configured.store(true, Ordering::SeqCst);
        assert!(feed.retry());
        assert!(feed.is_loading_first_page());
        feed.wait(SETTLE);
        assert_eq!(feed.items().len(), 2);
    }

    #[test]
    fn empty_search_fails_without_request() {
        let stub = trending_two_pages();
        let mut feed = Feed::new(stub.clone());
        feed.reset(FeedMode::Search("  ".into()));
        feed.wait(SETTLE);
        assert!(matches!(feed.error(), Some(CatalogError::InvalidArgument(_))));
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn shorts_cursor_is_clamped_and_prefetches() {
        let stub = StubCatalog::new(|call| match call.token.as_deref() {
            None => Ok(page("s", 1..=3, Some("N"))),
            _ => Ok(page("s", 4..=5, None)),
        });
        let mut deck = ShortsDeck::new(stub.clone());
        assert!(deck.load());
        deck.feed_mut().wait(SETTLE);

        assert!(!deck.prev());
        assert_eq!(deck.current().map(|video| video.id.as_str()), Some("s1"));
        assert!(deck.next());
        assert_eq!(deck.index(), 1);
        deck.feed_mut().wait(SETTLE);
        assert_eq!(deck.feed().items().len(), 5);

        while deck.next() {}
        assert_eq!(deck.index(), 4);
        assert!(!deck.next());
        assert_eq!(stub.calls().len(), 2);
    }
}
