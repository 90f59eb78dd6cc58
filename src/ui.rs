use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Tabs, Wrap,
};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

use crate::config::PlayerConfig;
use crate::data::{CatalogError, CatalogService, Comment, CommentService, VideoSummary};
use crate::feed::{Feed, FeedMode, Phase, ShortsDeck};
use crate::format;
use crate::router::{self, Route};
use crate::session;
use crate::video;
use crate::youtube::{CommentOrder, API_KEY_ENV};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(243, 139, 168);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const RELATED_LIMIT: usize = 10;
const SIDEBAR_WIDTH: u16 = 22;
const CHANNEL_HOME_LIMIT: usize = 6;

const FILTER_CHIPS: [&str; 18] = [
    "All",
    "Music",
    "Gaming",
    "Live",
    "News",
    "Sports",
    "Learning",
    "Fashion",
    "Beauty",
    "Comedy",
    "Entertainment",
    "Tech",
    "Science",
    "Movies",
    "Anime",
    "Cooking",
    "Travel",
    "DIY",
];

const NAV_ENTRIES: [(char, &str); 9] = [
    ('1', "Home"),
    ('2', "Trending"),
    ('3', "Shorts"),
    ('4', "Subscriptions"),
    ('5', "Library"),
    ('6', "History"),
    ('7', "Liked videos"),
    ('8', "Watch later"),
    ('9', "Sign out"),
];

fn nav_route(key: char) -> Option<Route> {
    match key {
        '1' => Some(Route::Home),
        '2' => Some(Route::Trending),
        '3' => Some(Route::Shorts),
        '4' => Some(Route::Subscriptions),
        '5' => Some(Route::Library),
        '6' => Some(Route::History),
        '7' => Some(Route::Liked),
        '8' => Some(Route::WatchLater),
        _ => None,
    }
}

fn nav_matches(key: char, route: &Route) -> bool {
    nav_route(key).is_some_and(|target| &target == route)
}

/// Feed a filter chip selects: the first chip is the trending chart, every
/// other chip searches for its own label.
fn chip_mode(index: usize) -> FeedMode {
    match FILTER_CHIPS.get(index) {
        Some(label) if index > 0 => FeedMode::Search((*label).to_string()),
        _ => FeedMode::Trending,
    }
}

/// How a listing lays out each video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLayout {
    Card,
    Row,
    Ranked,
    Compact,
}

impl ListLayout {
    pub fn for_route(route: &Route) -> Self {
        match route {
            Route::Home => ListLayout::Card,
            Route::Trending => ListLayout::Ranked,
            Route::Channel(_) | Route::Watch(_) => ListLayout::Compact,
            _ => ListLayout::Row,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelTab {
    Home,
    Videos,
    About,
}

impl ChannelTab {
    const ALL: [ChannelTab; 3] = [ChannelTab::Home, ChannelTab::Videos, ChannelTab::About];

    fn title(self) -> &'static str {
        match self {
            ChannelTab::Home => "Home",
            ChannelTab::Videos => "Videos",
            ChannelTab::About => "About",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

struct ChannelState {
    channel_id: String,
    tab: ChannelTab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchFocus {
    Related,
    Comments,
}

struct WatchState {
    video_id: String,
    video: Option<VideoSummary>,
    error: Option<CatalogError>,
    comments: Vec<Comment>,
    comments_error: Option<CatalogError>,
    comments_loaded: bool,
    comment_order: CommentOrder,
    focus: WatchFocus,
    related: ListState,
    comment_scroll: u16,
}

impl WatchState {
    fn new(video_id: String) -> Self {
        Self {
            video_id,
            video: None,
            error: None,
            comments: Vec::new(),
            comments_error: None,
            comments_loaded: false,
            comment_order: CommentOrder::default(),
            focus: WatchFocus::Related,
            related: ListState::default().with_selected(Some(0)),
            comment_scroll: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginField {
    Username,
    Password,
}

#[derive(Default)]
struct LoginForm {
    username: String,
    password: String,
    focus_password: bool,
    error: Option<String>,
}

impl LoginForm {
    fn field(&self) -> LoginField {
        if self.focus_password {
            LoginField::Password
        } else {
            LoginField::Username
        }
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.field() {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_field(&mut self) {
        self.focus_password = !self.focus_password;
    }
}

enum AsyncResponse {
    Video {
        request_id: u64,
        result: Result<VideoSummary, CatalogError>,
    },
    Comments {
        request_id: u64,
        result: Result<Vec<Comment>, CatalogError>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Options {
    pub status_message: String,
    pub catalog: Arc<dyn CatalogService>,
    pub comments: Arc<dyn CommentService>,
    pub session: Arc<session::Manager>,
    pub player: PlayerConfig,
    pub config_path: String,
    pub initial_route: Route,
}

pub struct Model {
    route: Route,
    back_stack: Vec<Route>,
    session: Arc<session::Manager>,
    catalog: Arc<dyn CatalogService>,
    comment_service: Arc<dyn CommentService>,
    player: PlayerConfig,
    config_path: String,

    feed: Feed,
    list_state: ListState,
    related: Feed,
    shorts: ShortsDeck,
    chip_index: usize,
    watch: Option<WatchState>,
    channel: Option<ChannelState>,
    subscriptions: Vec<(String, String)>,
    subscriptions_state: ListState,
    login: LoginForm,
    search_prompt: Option<String>,

    pending_video: Option<u64>,
    pending_comments: Option<u64>,
    next_request_id: u64,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,

    status_message: String,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let route = router::guard(opts.initial_route, opts.session.is_authenticated());
        let mut model = Self {
            route,
            back_stack: Vec::new(),
            feed: Feed::new(opts.catalog.clone()),
            related: Feed::new(opts.catalog.clone()),
            shorts: ShortsDeck::new(opts.catalog.clone()),
            session: opts.session,
            catalog: opts.catalog,
            comment_service: opts.comments,
            player: opts.player,
            config_path: opts.config_path,
            list_state: ListState::default(),
            chip_index: 0,
            watch: None,
            channel: None,
            subscriptions: Vec::new(),
            subscriptions_state: ListState::default(),
            login: LoginForm::default(),
            search_prompt: None,
            pending_video: None,
            pending_comments: None,
            next_request_id: 1,
            response_tx,
            response_rx,
            status_message: opts.status_message,
            spinner: Spinner::new(),
            needs_redraw: true,
        };
        model.enter_route();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.feed.is_loading()
            || self.related.is_loading()
            || self.shorts.feed().is_loading()
            || self.pending_video.is_some()
            || self.pending_comments.is_some()
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed |= self.feed.poll();
        changed |= self.related.poll();
        changed |= self.shorts.feed_mut().poll();
        self.sync_list_selection();
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Video { request_id, result } => {
                if self.pending_video != Some(request_id) {
                    debug!(request_id, "discarding stale video response");
                    return;
                }
                self.pending_video = None;
                let Some(watch) = self.watch.as_mut() else {
                    return;
                };
                match result {
                    Ok(video) => {
                        self.status_message = format!("Watching {}", video.title);
                        watch.video = Some(video);
                        watch.error = None;
                    }
                    Err(err) => {
                        warn!(error = %err, video_id = %watch.video_id, "video lookup failed");
                        self.status_message = format!("Failed to load video: {}", err);
                        watch.error = Some(err);
                    }
                }
            }
            AsyncResponse::Comments { request_id, result } => {
                if self.pending_comments != Some(request_id) {
                    debug!(request_id, "discarding stale comments response");
                    return;
                }
                self.pending_comments = None;
                let Some(watch) = self.watch.as_mut() else {
                    return;
                };
                watch.comments_loaded = true;
                match result {
                    Ok(comments) => {
                        watch.comments = comments;
                        watch.comments_error = None;
                        watch.comment_scroll = 0;
                    }
                    Err(err) => {
                        warn!(error = %err, "comments failed");
                        watch.comments_error = Some(err);
                    }
                }
            }
        }
    }

    fn sync_list_selection(&mut self) {
        let len = self.feed.items().len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            None => self.list_state.select(Some(0)),
            Some(index) if index >= len => self.list_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    fn navigate(&mut self, route: Route) {
        let target = router::guard(route, self.session.is_authenticated());
        if target == self.route {
            return;
        }
        if self.route != Route::Login && target != Route::Login {
            self.back_stack.push(self.route.clone());
        }
        self.route = target;
        self.enter_route();
    }

    fn go_back(&mut self) {
        while let Some(previous) = self.back_stack.pop() {
            let target = router::guard(previous, self.session.is_authenticated());
            if target == self.route {
                continue;
            }
            self.route = target;
            self.enter_route();
            return;
        }
        self.status_message = "Nothing to go back to.".to_string();
    }

    fn enter_route(&mut self) {
        debug!(path = %self.route.path(), "entering route");
        match self.route.clone() {
            Route::Login => {
                self.login = LoginForm::default();
                self.status_message = "Sign in to continue.".to_string();
            }
            Route::Home => self.ensure_feed(chip_mode(self.chip_index)),
            Route::Trending => self.ensure_feed(FeedMode::Trending),
            Route::Search(query) => self.ensure_feed(FeedMode::Search(query)),
            Route::Channel(channel_id) => {
                self.channel = Some(ChannelState {
                    channel_id: channel_id.clone(),
                    tab: ChannelTab::Home,
                });
                self.ensure_feed(FeedMode::Channel(channel_id));
            }
            Route::Watch(video_id) => self.open_watch(video_id),
            Route::Shorts => {
                if self.shorts.feed().mode().is_none() {
                    self.shorts.load();
                }
            }
            Route::Subscriptions => {
                if self.subscriptions_state.selected().is_none() && !self.subscriptions.is_empty()
                {
                    self.subscriptions_state.select(Some(0));
                }
            }
            Route::Library | Route::History | Route::Liked | Route::WatchLater => {}
        }
        self.mark_dirty();
    }

    fn ensure_feed(&mut self, mode: FeedMode) {
        if self.feed.mode() == Some(&mode) && self.feed.phase() != Phase::Idle {
            return;
        }
        self.status_message = format!("Loading {}…", mode.label());
        if self.feed.reset(mode) {
            self.list_state.select(None);
        }
    }

    fn open_watch(&mut self, video_id: String) {
        let already_open = self
            .watch
            .as_ref()
            .is_some_and(|watch| watch.video_id == video_id && watch.video.is_some());
        if !already_open {
            self.watch = Some(WatchState::new(video_id.clone()));
            self.request_video(video_id);
            self.request_comments();
        }
        if self.related.mode() != Some(&FeedMode::Trending) {
            self.related.reset(FeedMode::Trending);
        }
    }

    fn request_video(&mut self, video_id: String) {
        let request_id = self.next_request_id();
        self.pending_video = Some(request_id);
        self.status_message = "Loading video…".to_string();
        let tx = self.response_tx.clone();
        let catalog = self.catalog.clone();
        thread::spawn(move || {
            let result = catalog.fetch_by_id(&video_id);
            let _ = tx.send(AsyncResponse::Video { request_id, result });
        });
    }

    fn request_comments(&mut self) {
        let Some(watch) = self.watch.as_ref() else {
            return;
        };
        let video_id = watch.video_id.clone();
        let order = watch.comment_order;
        let request_id = self.next_request_id();
        self.pending_comments = Some(request_id);
        let tx = self.response_tx.clone();
        let service = self.comment_service.clone();
        thread::spawn(move || {
            let result = service.load_comments(&video_id, order);
            let _ = tx.send(AsyncResponse::Comments { request_id, result });
        });
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }
        if self.search_prompt.is_some() {
            self.handle_prompt_key(key.code);
            self.mark_dirty();
            return Ok(false);
        }
        if self.route == Route::Login {
            self.handle_login_key(key.code);
            self.mark_dirty();
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') => {
                self.search_prompt = Some(String::new());
                self.status_message = "Search: type a query and press Enter.".to_string();
            }
            KeyCode::Esc | KeyCode::Backspace => self.go_back(),
            KeyCode::Char('9') => self.logout()?,
            KeyCode::Char(ch) if nav_route(ch).is_some() => {
                if let Some(route) = nav_route(ch) {
                    self.navigate(route);
                }
            }
            KeyCode::Char('r') => self.retry(),
            KeyCode::Char('o') => self.open_selected_in_browser()?,
            KeyCode::Char('p') => self.play_selected()?,
            KeyCode::Char('y') => self.copy_selected_url()?,
            code => match self.route.clone() {
                Route::Watch(_) => self.handle_watch_key(code),
                Route::Shorts => self.handle_shorts_key(code),
                Route::Subscriptions => self.handle_subscriptions_key(code),
                Route::Channel(_) => self.handle_channel_key(code),
                _ => self.handle_listing_key(code),
            },
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        let Some(buffer) = self.search_prompt.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.search_prompt = None;
                self.status_message = "Search cancelled.".to_string();
            }
            KeyCode::Enter => {
                let query = buffer.trim().to_string();
                if query.is_empty() {
                    self.status_message = "Type something to search for.".to_string();
                    return;
                }
                self.search_prompt = None;
                self.navigate(Route::Search(query));
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(ch) => buffer.push(ch),
            _ => {}
        }
    }

    fn handle_login_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.toggle_field()
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Backspace => {
                self.login.active_value_mut().pop();
            }
            KeyCode::Esc => self.login.error = None,
            KeyCode::Char(ch) => self.login.active_value_mut().push(ch),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        match self.session.login(&self.login.username) {
            Ok(identity) => {
                self.status_message = format!("Signed in as {}.", identity.username);
                self.login = LoginForm::default();
                self.back_stack.clear();
                self.navigate(Route::Home);
            }
            Err(err) => {
                self.login.error = Some(err.to_string());
                self.status_message = format!("Sign in failed: {}", err);
            }
        }
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        self.back_stack.clear();
        self.watch = None;
        self.channel = None;
        self.route = Route::Login;
        self.enter_route();
        self.status_message = "Signed out.".to_string();
        Ok(())
    }

    fn retry(&mut self) {
        match self.route.clone() {
            Route::Watch(video_id) => {
                let Some(watch) = self.watch.as_ref() else {
                    return;
                };
                let video_failed = watch.error.is_some();
                let comments_failed = watch.comments_error.is_some();
                if video_failed && self.pending_video.is_none() {
                    self.request_video(video_id);
                }
                if comments_failed && self.pending_comments.is_none() {
                    self.request_comments();
                }
                if self.related.phase() == Phase::Error {
                    self.related.retry();
                }
            }
            Route::Shorts => {
                let feed = self.shorts.feed_mut();
                if feed.phase() == Phase::Error {
                    feed.retry();
                } else {
                    self.shorts.load();
                }
                self.status_message = "Reloading shorts…".to_string();
            }
            Route::Home
            | Route::Trending
            | Route::Search(_)
            | Route::Channel(_) => {
                if self.feed.phase() == Phase::Error {
                    self.feed.retry();
                    self.status_message = "Retrying…".to_string();
                } else if let Some(mode) = self.feed.mode().cloned() {
                    if self.feed.reset(mode) {
                        self.list_state.select(None);
                        self.status_message = "Refreshing…".to_string();
                    }
                }
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.feed.items().len();
        if len == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as i64;
        let next = (current + delta).clamp(0, len as i64 - 1) as usize;
        self.list_state.select(Some(next));
        if self.feed.near_end(next) {
            self.status_message = "Loading more…".to_string();
        }
    }

    fn handle_listing_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.move_selection(5),
            KeyCode::PageUp => self.move_selection(-5),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(i64::MIN / 2),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(i64::MAX / 2),
            KeyCode::Enter => self.open_selected_video(),
            KeyCode::Char('h') | KeyCode::Left if self.route == Route::Home => {
                self.select_chip(self.chip_index.checked_sub(1).unwrap_or(FILTER_CHIPS.len() - 1))
            }
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab if self.route == Route::Home => {
                self.select_chip((self.chip_index + 1) % FILTER_CHIPS.len())
            }
            _ => {}
        }
    }

    fn select_chip(&mut self, index: usize) {
        self.chip_index = index;
        let mode = chip_mode(index);
        self.status_message = format!("Loading {}…", FILTER_CHIPS[index]);
        if self.feed.reset(mode) {
            self.list_state.select(None);
        }
    }

    fn open_selected_video(&mut self) {
        let selected = self
            .list_state
            .selected()
            .and_then(|index| self.feed.items().get(index))
            .map(|video| video.id.clone());
        if let Some(id) = selected {
            self.navigate(Route::Watch(id));
        }
    }

    fn handle_channel_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Tab => {
                if let Some(channel) = self.channel.as_mut() {
                    channel.tab = channel.tab.next();
                }
            }
            KeyCode::Char('u') => self.toggle_subscription(),
            other => self.handle_listing_key(other),
        }
    }

    fn channel_title(&self) -> String {
        let Some(channel) = self.channel.as_ref() else {
            return String::new();
        };
        self.feed
            .items()
            .iter()
            .find(|video| video.channel_id == channel.channel_id && !video.channel_title.is_empty())
            .map(|video| video.channel_title.clone())
            .unwrap_or_else(|| channel.channel_id.replace('-', " "))
    }

    fn is_subscribed(&self, channel_id: &str) -> bool {
        self.subscriptions.iter().any(|(id, _)| id == channel_id)
    }

    fn toggle_subscription(&mut self) {
        let Some(channel_id) = self.channel.as_ref().map(|c| c.channel_id.clone()) else {
            return;
        };
        if self.is_subscribed(&channel_id) {
            self.subscriptions.retain(|(id, _)| id != &channel_id);
            self.status_message = "Unsubscribed.".to_string();
        } else {
            let title = self.channel_title();
            self.status_message = format!("Subscribed to {}.", title);
            self.subscriptions.push((channel_id, title));
        }
        if self.subscriptions.is_empty() {
            self.subscriptions_state.select(None);
        } else if self.subscriptions_state.selected().is_none() {
            self.subscriptions_state.select(Some(0));
        }
    }

    fn handle_subscriptions_key(&mut self, code: KeyCode) {
        let len = self.subscriptions.len();
        if len == 0 {
            return;
        }
        let current = self.subscriptions_state.selected().unwrap_or(0);
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.subscriptions_state.select(Some((current + 1).min(len - 1)))
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.subscriptions_state.select(Some(current.saturating_sub(1)))
            }
            KeyCode::Enter => {
                if let Some((id, _)) = self.subscriptions.get(current).cloned() {
                    self.navigate(Route::Channel(id));
                }
            }
            _ => {}
        }
    }

    fn handle_watch_key(&mut self, code: KeyCode) {
        let related_ids: Vec<String> = self
            .watch
            .as_ref()
            .map(|watch| {
                related_videos(&self.related, &watch.video_id)
                    .map(|video| video.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        let related_len = related_ids.len();
        let mut open: Option<String> = None;
        let mut channel: Option<String> = None;
        let mut reload_comments = false;
        {
            let Some(watch) = self.watch.as_mut() else {
                return;
            };
            match (code, watch.focus) {
                (KeyCode::Tab, _) => {
                    watch.focus = match watch.focus {
                        WatchFocus::Related => WatchFocus::Comments,
                        WatchFocus::Comments => WatchFocus::Related,
                    }
                }
                (KeyCode::Char('c'), _) => {
                    watch.comment_order = watch.comment_order.toggled();
                    reload_comments = true;
                }
                (KeyCode::Char('C'), _) => {
                    channel = watch
                        .video
                        .as_ref()
                        .map(|video| video.channel_id.clone())
                        .filter(|id| !id.is_empty());
                }
                (KeyCode::Char('j') | KeyCode::Down, WatchFocus::Related) if related_len > 0 => {
                    let next = watch.related.selected().map_or(0, |i| i + 1);
                    watch.related.select(Some(next.min(related_len - 1)));
                }
                (KeyCode::Char('k') | KeyCode::Up, WatchFocus::Related) => {
                    let prev = watch.related.selected().unwrap_or(0).saturating_sub(1);
                    watch.related.select(Some(prev));
                }
                (KeyCode::Enter, WatchFocus::Related) => {
                    open = watch
                        .related
                        .selected()
                        .and_then(|index| related_ids.get(index).cloned());
                }
                (KeyCode::Char('j') | KeyCode::Down, WatchFocus::Comments) => {
                    watch.comment_scroll = watch.comment_scroll.saturating_add(1);
                }
                (KeyCode::Char('k') | KeyCode::Up, WatchFocus::Comments) => {
                    watch.comment_scroll = watch.comment_scroll.saturating_sub(1);
                }
                (KeyCode::PageDown, WatchFocus::Comments) => {
                    watch.comment_scroll = watch.comment_scroll.saturating_add(10);
                }
                (KeyCode::PageUp, WatchFocus::Comments) => {
                    watch.comment_scroll = watch.comment_scroll.saturating_sub(10);
                }
                _ => {}
            }
            if reload_comments {
                self.status_message =
                    format!("Sorting comments: {}", watch.comment_order.display_name());
                watch.comments.clear();
                watch.comments_loaded = false;
            }
        }
        if reload_comments {
            self.request_comments();
        }
        if let Some(id) = open {
            self.navigate(Route::Watch(id));
        } else if let Some(id) = channel {
            self.navigate(Route::Channel(id));
        }
    }

    fn handle_shorts_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('n') => {
                if !self.shorts.next() && self.shorts.feed().is_loading() {
                    self.status_message = "Loading more shorts…".to_string();
                }
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::Char('N') => {
                self.shorts.prev();
            }
            KeyCode::Enter => {
                if let Some(id) = self.shorts.current().map(|video| video.id.clone()) {
                    self.navigate(Route::Watch(id));
                }
            }
            _ => {}
        }
    }

    fn selected_video(&self) -> Option<&VideoSummary> {
        match &self.route {
            Route::Watch(_) => self.watch.as_ref().and_then(|watch| watch.video.as_ref()),
            Route::Shorts => self.shorts.current(),
            Route::Home | Route::Trending | Route::Search(_) | Route::Channel(_) => self
                .list_state
                .selected()
                .and_then(|index| self.feed.items().get(index)),
            _ => None,
        }
    }

    fn selected_watch_url(&self) -> Result<(String, String)> {
        let Some(video) = self.selected_video() else {
            bail!("no video selected");
        };
        Ok((video::watch_url(&video.id), video.title.clone()))
    }

    fn open_selected_in_browser(&mut self) -> Result<()> {
        let (url, _) = self.selected_watch_url()?;
        video::open_in_browser(&url)?;
        self.status_message = format!("Opened {url} in your browser.");
        Ok(())
    }

    fn play_selected(&mut self) -> Result<()> {
        let (url, title) = self.selected_watch_url()?;
        video::spawn_external_player(video::ExternalLaunchOptions {
            command: &self.player.video_command,
            url: &url,
            title: &title,
            detach: self.player.video_detach,
        })?;
        self.status_message = format!("Playing {title}.");
        Ok(())
    }

    fn copy_selected_url(&mut self) -> Result<()> {
        let (url, _) = self.selected_watch_url()?;
        let mut clipboard =
            arboard::Clipboard::new().map_err(|err| anyhow!("open clipboard: {}", err))?;
        clipboard
            .set_text(url.clone())
            .map_err(|err| anyhow!("copy video link: {}", err))?;
        self.status_message = format!("Copied {url} to clipboard.");
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        frame.render_widget(self.header_line(), layout[0]);

        if self.route == Route::Login {
            self.draw_login(frame, layout[1]);
        } else {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                .split(layout[1]);
            self.draw_sidebar(frame, columns[0]);
            let main = columns[1];
            match self.route.clone() {
                Route::Home => self.draw_home(frame, main),
                Route::Watch(_) => self.draw_watch(frame, main),
                Route::Shorts => self.draw_shorts(frame, main),
                Route::Channel(_) => self.draw_channel(frame, main),
                Route::Subscriptions => self.draw_subscriptions(frame, main),
                Route::Library | Route::History | Route::Liked | Route::WatchLater => {
                    self.draw_placeholder(frame, main)
                }
                route => {
                    let block = panel_block(&route.title(), true);
                    let inner = block.inner(main);
                    frame.render_widget(block, main);
                    self.draw_feed_list(frame, inner, ListLayout::for_route(&route));
                }
            }
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[2]);

        if self.search_prompt.is_some() {
            self.draw_search_prompt(frame, layout[1]);
        }
    }

    fn header_line(&self) -> Paragraph<'static> {
        let mut spans = vec![
            Span::styled(
                " ▶ Tube-TUI ",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("· {} ", self.route.title()),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
        ];
        let status = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        spans.push(Span::styled(
            format!("· {}", status.trim()),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ));
        if let Some(username) = self.session.username() {
            spans.push(Span::styled(
                format!("  [{username}]"),
                Style::default().fg(COLOR_SUCCESS),
            ));
        }
        Paragraph::new(Line::from(spans)).style(
            Style::default()
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        )
    }

    fn draw_sidebar(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = panel_block("Menu", false);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let lines: Vec<Line<'static>> = NAV_ENTRIES
            .iter()
            .map(|(key, label)| {
                let active = nav_matches(*key, &self.route);
                let style = if active {
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .bg(COLOR_PANEL_SELECTED_BG)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(COLOR_TEXT_PRIMARY)
                };
                Line::from(vec![
                    Span::styled(format!("{key} "), Style::default().fg(COLOR_TEXT_SECONDARY)),
                    Span::styled(label.to_string(), style),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_home(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = panel_block("Home", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);
        frame.render_widget(chip_row(self.chip_index, rows[0].width), rows[0]);
        self.draw_feed_list(frame, rows[1], ListLayout::Card);
    }

    /// Shared listing body: setup hint, error banner, empty and loading states
    /// around one video list.
    fn draw_feed_list(&mut self, frame: &mut Frame<'_>, area: Rect, layout: ListLayout) {
        if let Some(err) = self.feed.error().filter(|err| err.is_config()) {
            frame.render_widget(setup_hint(err, &self.config_path), area);
            return;
        }

        let mut footer: Option<Line<'static>> = None;
        if let Some(err) = self.feed.error() {
            footer = Some(error_banner(err));
        } else if self.feed.is_loading_next_page() {
            footer = Some(Line::from(Span::styled(
                format!("{} Loading more…", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
        } else if self.feed.is_exhausted() && !self.feed.items().is_empty() {
            footer = Some(Line::from(Span::styled(
                "End of results",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
        }

        let (list_area, footer_area) = split_footer(area, footer.is_some());
        let empty_message = if self.feed.is_loading_first_page() {
            format!("{} Loading videos…", self.spinner.frame())
        } else if self.feed.error().is_some() {
            String::new()
        } else {
            "No videos found.".to_string()
        };
        render_video_list(
            frame,
            list_area,
            self.feed.items(),
            &mut self.list_state,
            layout,
            &empty_message,
        );
        if let (Some(line), Some(area)) = (footer, footer_area) {
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn draw_watch(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[0]);

        let Some(watch) = self.watch.as_mut() else {
            return;
        };

        let details_block = panel_block("Watch", false);
        let details_inner = details_block.inner(left[0]);
        frame.render_widget(details_block, left[0]);
        if let Some(err) = watch.error.as_ref() {
            let widget = if err.is_config() {
                setup_hint(err, &self.config_path)
            } else {
                Paragraph::new(error_banner(err)).wrap(Wrap { trim: true })
            };
            frame.render_widget(widget, details_inner);
        } else if let Some(video) = watch.video.as_ref() {
            let subscribed = self
                .subscriptions
                .iter()
                .any(|(id, _)| id == &video.channel_id);
            let text = watch_details(video, details_inner.width as usize, subscribed);
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), details_inner);
        } else {
            frame.render_widget(
                Paragraph::new(format!("{} Loading video…", self.spinner.frame()))
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                details_inner,
            );
        }

        let comments_title = format!("Comments · {}", watch.comment_order.display_name());
        let comments_block = panel_block(&comments_title, watch.focus == WatchFocus::Comments);
        let comments_inner = comments_block.inner(left[1]);
        frame.render_widget(comments_block, left[1]);
        let comments_text = if let Some(err) = watch.comments_error.as_ref() {
            Text::from(error_banner(err))
        } else if !watch.comments_loaded {
            Text::from(format!("{} Loading comments…", self.spinner.frame()))
        } else if watch.comments.is_empty() {
            Text::from("No comments yet.")
        } else {
            comment_lines(&watch.comments, comments_inner.width as usize, Utc::now())
        };
        frame.render_widget(
            Paragraph::new(comments_text)
                .style(Style::default().fg(COLOR_TEXT_PRIMARY))
                .scroll((watch.comment_scroll, 0)),
            comments_inner,
        );

        let related_block = panel_block("Up next", watch.focus == WatchFocus::Related);
        let related_inner = related_block.inner(columns[1]);
        frame.render_widget(related_block, columns[1]);
        let related: Vec<VideoSummary> = related_videos(&self.related, &watch.video_id)
            .cloned()
            .collect();
        let empty = if self.related.is_loading() {
            format!("{} Loading…", self.spinner.frame())
        } else if let Some(err) = self.related.error() {
            err.to_string()
        } else {
            "Nothing related.".to_string()
        };
        render_video_list(
            frame,
            related_inner,
            &related,
            &mut watch.related,
            ListLayout::Compact,
            &empty,
        );
    }

    fn draw_shorts(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = panel_block("Shorts", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let feed = self.shorts.feed();
        if let Some(err) = feed.error() {
            if err.is_config() {
                frame.render_widget(setup_hint(err, &self.config_path), inner);
                return;
            }
            if feed.items().is_empty() {
                frame.render_widget(Paragraph::new(error_banner(err)), inner);
                return;
            }
        }
        let Some(short) = self.shorts.current() else {
            let message = if feed.is_loading() {
                format!("{} Loading shorts…", self.spinner.frame())
            } else {
                "No shorts available.".to_string()
            };
            frame.render_widget(
                Paragraph::new(message).style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                inner,
            );
            return;
        };

        let card = centered_rect(60, 80, inner);
        frame.render_widget(Clear, card);
        let card_block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_FOCUSED_BG))
            .padding(Padding::uniform(1))
            .title(Span::styled(
                format!(" {} / {} ", self.shorts.index() + 1, feed.items().len()),
                Style::default().fg(COLOR_ACCENT),
            ));
        let card_inner = card_block.inner(card);
        frame.render_widget(card_block, card);

        let width = card_inner.width as usize;
        let mut lines = vec![
            Line::from(Span::styled(
                short.title.clone(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                short.channel_title.clone(),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::from(Span::styled(
                video_meta(short, Utc::now()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::default(),
        ];
        lines.extend(wrap_plain(
            &short.description,
            width.max(1),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ));
        if feed.is_loading_next_page() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!("{} Loading more shorts…", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), card_inner);
    }

    fn draw_channel(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(channel) = self.channel.as_ref() else {
            return;
        };
        let tab = channel.tab;
        let channel_id = channel.channel_id.clone();
        let title = self.channel_title();
        let subscribed = self.is_subscribed(&channel_id);

        let block = panel_block(&title, true);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        let handle = format!("@{}", title.replace(' ', "").to_lowercase());
        let subscribe = if subscribed {
            Span::styled("✓ Subscribed (u)", Style::default().fg(COLOR_SUCCESS))
        } else {
            Span::styled(
                "Subscribe (u)",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(handle, Style::default().fg(COLOR_TEXT_SECONDARY)),
                Span::raw("   "),
                subscribe,
            ])),
            rows[0],
        );

        let tabs = Tabs::new(ChannelTab::ALL.iter().map(|tab| tab.title()).collect::<Vec<_>>())
            .select(tab.index())
            .style(Style::default().fg(COLOR_TEXT_SECONDARY))
            .highlight_style(
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            );
        frame.render_widget(tabs, rows[1]);

        match tab {
            ChannelTab::Home => {
                let latest: Vec<VideoSummary> = self
                    .feed
                    .items()
                    .iter()
                    .take(CHANNEL_HOME_LIMIT)
                    .cloned()
                    .collect();
                if self.feed.error().is_some() || latest.is_empty() {
                    self.draw_feed_list(frame, rows[2], ListLayout::Card);
                } else {
                    let mut state = self.list_state.clone();
                    if state.selected().is_some_and(|index| index >= latest.len()) {
                        state.select(Some(latest.len() - 1));
                    }
                    render_video_list(frame, rows[2], &latest, &mut state, ListLayout::Card, "");
                }
            }
            ChannelTab::Videos => self.draw_feed_list(frame, rows[2], ListLayout::Compact),
            ChannelTab::About => {
                let lines = vec![
                    Line::from(Span::styled(
                        title.clone(),
                        Style::default()
                            .fg(COLOR_TEXT_PRIMARY)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(format!("Channel id: {channel_id}")),
                    Line::from(format!("Link: {}", video::channel_url(&channel_id))),
                    Line::from(format!(
                        "Videos loaded: {}{}",
                        self.feed.items().len(),
                        if self.feed.is_exhausted() { "" } else { "+" }
                    )),
                ];
                frame.render_widget(
                    Paragraph::new(lines).style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                    rows[2],
                );
            }
        }
    }

    fn draw_subscriptions(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = panel_block("Subscriptions", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if self.subscriptions.is_empty() {
            frame.render_widget(
                Paragraph::new("No subscriptions yet. Open a channel and press u to subscribe.")
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                    .wrap(Wrap { trim: true }),
                inner,
            );
            return;
        }
        let items: Vec<ListItem<'static>> = self
            .subscriptions
            .iter()
            .map(|(id, title)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        title.clone(),
                        Style::default()
                            .fg(COLOR_TEXT_PRIMARY)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!("  {id}"), Style::default().fg(COLOR_TEXT_SECONDARY)),
                ]))
            })
            .collect();
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(COLOR_PANEL_SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_stateful_widget(list, inner, &mut self.subscriptions_state);
    }

    fn draw_placeholder(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let title = self.route.title();
        let block = panel_block(&title, true);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let message = format!("{title} will appear here once you start watching.");
        let mut state = ListState::default();
        render_video_list(frame, inner, &[], &mut state, ListLayout::Row, &message);
    }

    fn draw_login(&self, frame: &mut Frame<'_>, area: Rect) {
        let form_area = centered_rect(50, 50, area);
        frame.render_widget(Clear, form_area);
        let block = panel_block("Sign in", true);
        let inner = block.inner(form_area);
        frame.render_widget(block, form_area);

        let field_line = |label: &str, value: String, focused: bool| {
            let style = if focused {
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .bg(COLOR_PANEL_SELECTED_BG)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            let cursor = if focused { "▏" } else { "" };
            Line::from(vec![
                Span::styled(
                    format!("{label:<10}"),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
                Span::styled(format!("{value}{cursor}"), style),
            ])
        };

        let mut lines = vec![
            Line::from(Span::styled(
                "Welcome to Tube-TUI",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            field_line(
                "Username",
                self.login.username.clone(),
                self.login.field() == LoginField::Username,
            ),
            field_line(
                "Password",
                "•".repeat(self.login.password.chars().count()),
                self.login.field() == LoginField::Password,
            ),
            Line::default(),
            Line::from(Span::styled(
                "Any username works; the password is not checked.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ];
        if let Some(error) = &self.login.error {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(COLOR_ERROR),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn draw_search_prompt(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(buffer) = &self.search_prompt else {
            return;
        };
        let width = area.width.saturating_sub(8).min(70);
        let prompt_area = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + 1,
            width,
            height: 3,
        };
        frame.render_widget(Clear, prompt_area);
        let block = Block::default()
            .title(Span::styled(
                " Search ",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_FOCUSED_BG));
        frame.render_widget(
            Paragraph::new(format!("{buffer}▏")).block(block),
            prompt_area,
        );
    }

    fn footer_text(&self) -> String {
        if self.search_prompt.is_some() {
            return "Enter search · Esc cancel".to_string();
        }
        let mut parts: Vec<&str> = Vec::new();
        match &self.route {
            Route::Login => {
                return "Tab switch field · Enter sign in · Ctrl-C quit".to_string();
            }
            Route::Home => {
                parts.push("j/k move");
                parts.push("h/l filter");
                parts.push("Enter watch");
            }
            Route::Trending | Route::Search(_) => {
                parts.push("j/k move");
                parts.push("Enter watch");
            }
            Route::Channel(_) => {
                parts.push("j/k move");
                parts.push("Tab switch tab");
                parts.push("u subscribe");
                parts.push("Enter watch");
            }
            Route::Watch(_) => {
                parts.push("Tab related/comments");
                parts.push("c sort comments");
                parts.push("C channel");
            }
            Route::Shorts => {
                parts.push("j/k next/prev");
                parts.push("Enter watch");
            }
            Route::Subscriptions => {
                parts.push("j/k move");
                parts.push("Enter open channel");
            }
            Route::Library | Route::History | Route::Liked | Route::WatchLater => {}
        }
        if self.selected_video().is_some() {
            parts.push("p play");
            parts.push("o browser");
            parts.push("y copy link");
        }
        parts.push("/ search");
        parts.push("1-8 menu");
        parts.push("r retry");
        parts.push("Esc back");
        parts.push("9 sign out");
        parts.push("q quit");
        parts.join(" · ")
    }
}

fn panel_block(title: &str, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(COLOR_BORDER_FOCUSED)
    } else {
        Style::default().fg(COLOR_BORDER_IDLE)
    };
    let title_style = if focused {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    Block::default()
        .title(Span::styled(format!(" {title} "), title_style))
        .borders(Borders::ALL)
        .border_style(border_style)
        .style(Style::default().bg(COLOR_PANEL_BG))
        .padding(Padding::horizontal(1))
}

/// Up-next entries for the watch page: the trending chart minus the video
/// being watched.
fn related_videos<'a>(
    related: &'a Feed,
    current_id: &'a str,
) -> impl Iterator<Item = &'a VideoSummary> + 'a {
    related
        .items()
        .iter()
        .filter(move |video| video.id != current_id)
        .take(RELATED_LIMIT)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn split_footer(area: Rect, has_footer: bool) -> (Rect, Option<Rect>) {
    if !has_footer || area.height < 2 {
        return (area, None);
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    (chunks[0], Some(chunks[1]))
}

fn chip_row(selected: usize, width: u16) -> Paragraph<'static> {
    let mut spans = Vec::new();
    let mut used = 0usize;
    let start = selected.saturating_sub(2);
    for (index, label) in FILTER_CHIPS.iter().enumerate().skip(start) {
        let text = format!(" {label} ");
        used += UnicodeWidthStr::width(text.as_str()) + 1;
        if used > width as usize && index > selected {
            break;
        }
        let style = if index == selected {
            Style::default()
                .fg(COLOR_BG)
                .bg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_SELECTED_BG)
        };
        spans.push(Span::styled(text, style));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(Line::from(spans))
}

fn setup_hint(err: &CatalogError, config_path: &str) -> Paragraph<'static> {
    let lines = vec![
        Line::from(Span::styled(
            "YouTube Data API key required",
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(format!(
            "Export {API_KEY_ENV}=<your key> before starting, or set catalog.api_key in {config_path}."
        )),
        Line::from("Keys are created in the Google Cloud console with the YouTube Data API v3 enabled."),
        Line::default(),
        Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
        Line::from(Span::styled(
            "Press r to retry.",
            Style::default().fg(COLOR_ACCENT),
        )),
    ];
    Paragraph::new(lines)
        .style(Style::default().fg(COLOR_TEXT_PRIMARY))
        .wrap(Wrap { trim: true })
}

fn error_banner(err: &CatalogError) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("✗ {err}"),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  (r to retry)", Style::default().fg(COLOR_TEXT_SECONDARY)),
    ])
}

fn render_video_list(
    frame: &mut Frame<'_>,
    area: Rect,
    items: &[VideoSummary],
    state: &mut ListState,
    layout: ListLayout,
    empty_message: &str,
) {
    if items.is_empty() {
        frame.render_widget(
            Paragraph::new(empty_message.to_string())
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    }
    let now = Utc::now();
    let width = area.width.saturating_sub(2) as usize;
    let list_items: Vec<ListItem<'static>> = items
        .iter()
        .enumerate()
        .map(|(index, video)| ListItem::new(video_lines(video, index, layout, width, now)))
        .collect();
    let list = List::new(list_items)
        .highlight_style(Style::default().bg(COLOR_PANEL_SELECTED_BG))
        .highlight_symbol("▌ ");
    frame.render_stateful_widget(list, area, state);
}

fn video_meta(video: &VideoSummary, now: DateTime<Utc>) -> String {
    let mut parts = Vec::new();
    if let Some(views) = video.view_count().and_then(|raw| raw.parse::<u64>().ok()) {
        parts.push(format!("{} views", format::compact_count(views)));
    }
    if let Some(published) = format::parse_timestamp(&video.published_at) {
        parts.push(format::time_ago(published, now));
    }
    parts.join(" • ")
}

fn video_lines(
    video: &VideoSummary,
    index: usize,
    layout: ListLayout,
    width: usize,
    now: DateTime<Utc>,
) -> Vec<Line<'static>> {
    let title_style = Style::default()
        .fg(COLOR_TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    let secondary = Style::default().fg(COLOR_TEXT_SECONDARY);
    let meta = video_meta(video, now);

    match layout {
        ListLayout::Card => vec![
            Line::from(Span::styled(truncate_to_width(&video.title, width), title_style)),
            Line::from(Span::styled(
                truncate_to_width(&video.channel_title, width),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::from(Span::styled(truncate_to_width(&meta, width), secondary)),
            Line::default(),
        ],
        ListLayout::Row => {
            let byline = if meta.is_empty() {
                video.channel_title.clone()
            } else {
                format!("{} • {}", video.channel_title, meta)
            };
            let snippet = video.description.lines().next().unwrap_or_default();
            vec![
                Line::from(Span::styled(truncate_to_width(&video.title, width), title_style)),
                Line::from(Span::styled(truncate_to_width(&byline, width), secondary)),
                Line::from(Span::styled(
                    truncate_to_width(snippet, width),
                    secondary.add_modifier(Modifier::DIM),
                )),
            ]
        }
        ListLayout::Ranked => {
            let rank = format!("#{:<3} ", index + 1);
            let indent = " ".repeat(rank.len());
            let rest = width.saturating_sub(rank.len());
            let byline = if meta.is_empty() {
                video.channel_title.clone()
            } else {
                format!("{} • {}", video.channel_title, meta)
            };
            vec![
                Line::from(vec![
                    Span::styled(
                        rank,
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(truncate_to_width(&video.title, rest), title_style),
                ]),
                Line::from(vec![
                    Span::raw(indent),
                    Span::styled(truncate_to_width(&byline, rest), secondary),
                ]),
            ]
        }
        ListLayout::Compact => {
            let suffix = if meta.is_empty() {
                format!(" · {}", video.channel_title)
            } else {
                format!(" · {} · {}", video.channel_title, meta)
            };
            let suffix_width = UnicodeWidthStr::width(suffix.as_str()).min(width / 2);
            let title_width = width.saturating_sub(suffix_width);
            vec![Line::from(vec![
                Span::styled(
                    truncate_to_width(&video.title, title_width),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ),
                Span::styled(truncate_to_width(&suffix, suffix_width), secondary),
            ])]
        }
    }
}

fn watch_details(video: &VideoSummary, width: usize, subscribed: bool) -> Text<'static> {
    let secondary = Style::default().fg(COLOR_TEXT_SECONDARY);
    let mut stats = Vec::new();
    if let Some(views) = video.view_count().and_then(|raw| raw.parse::<u64>().ok()) {
        stats.push(format!("{} views", format::grouped_count(views)));
    }
    if let Some(published) = format::parse_timestamp(&video.published_at) {
        stats.push(format::publish_date(published));
    }
    if let Some(likes) = video.like_count().and_then(|raw| raw.parse::<u64>().ok()) {
        stats.push(format!("{} likes", format::compact_count(likes)));
    }

    let mut channel = vec![Span::styled(
        video.channel_title.clone(),
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD),
    )];
    if subscribed {
        channel.push(Span::styled("  ✓ Subscribed", Style::default().fg(COLOR_SUCCESS)));
    }

    let mut lines = vec![
        Line::from(Span::styled(
            video.title.clone(),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(channel),
        Line::from(Span::styled(stats.join(" • "), secondary)),
        Line::from(Span::styled(video::watch_url(&video.id), secondary)),
    ];
    if let Some(thumb) = video.best_thumbnail() {
        lines.push(Line::from(Span::styled(
            format!("Thumbnail: {}", thumb.url),
            secondary,
        )));
    }
    lines.push(Line::default());
    lines.extend(wrap_plain(
        &video.description,
        width.max(1),
        Style::default().fg(COLOR_TEXT_PRIMARY),
    ));
    Text::from(lines)
}

fn comment_lines(comments: &[Comment], width: usize, now: DateTime<Utc>) -> Text<'static> {
    let mut lines = Vec::new();
    for comment in comments {
        let mut header = vec![Span::styled(
            comment.author.clone(),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(published) = format::parse_timestamp(&comment.published_at) {
            header.push(Span::styled(
                format!("  {}", format::time_ago(published, now)),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ));
        }
        lines.push(Line::from(header));
        lines.extend(wrap_plain(
            &comment.text,
            width.max(1),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ));
        let mut footer = format!("▲ {}", format::compact_count(comment.like_count.max(0) as u64));
        if comment.reply_count > 0 {
            footer.push_str(&format!(" · {} replies", comment.reply_count));
        }
        lines.push(Line::from(Span::styled(
            footer,
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
        lines.push(Line::default());
    }
    Text::from(lines)
}

fn wrap_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }
        for piece in wrap(paragraph, WrapOptions::new(width)) {
            lines.push(Line::from(Span::styled(piece.into_owned(), style)));
        }
    }
    lines
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
