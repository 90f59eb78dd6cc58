use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::data::CatalogError;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

const VIDEO_PARTS: &str = "snippet,statistics";

/// Reasons the Data API reports when the key itself is the problem.
const CREDENTIAL_REASONS: [&str; 6] = [
    "keyInvalid",
    "keyExpired",
    "accessNotConfigured",
    "ipRefererBlocked",
    "API_KEY_INVALID",
    "API_KEY_SERVICE_BLOCKED",
];

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub user_agent: String,
    pub region_code: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    #[default]
    Relevance,
    Time,
}

impl CommentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentOrder::Relevance => "relevance",
            CommentOrder::Time => "time",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CommentOrder::Relevance => "Top comments",
            CommentOrder::Time => "Newest first",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            CommentOrder::Relevance => CommentOrder::Time,
            CommentOrder::Time => CommentOrder::Relevance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoDuration {
    #[default]
    Any,
    Short,
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub channel_id: Option<String>,
    pub order: Option<&'static str>,
    pub duration: VideoDuration,
    pub page_token: Option<String>,
    pub max_results: u32,
}

impl SearchParams {
    fn into_params(self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        if let Some(query) = self.query {
            params.push(("q", query));
        }
        if let Some(channel_id) = self.channel_id {
            params.push(("channelId", channel_id));
        }
        if let Some(order) = self.order {
            params.push(("order", order.to_string()));
        }
        if self.duration == VideoDuration::Short {
            params.push(("videoDuration", "short".to_string()));
        }
        if let Some(token) = self.page_token {
            params.push(("pageToken", token));
        }
        params
    }
}

pub struct Client {
    http: HttpClient,
    api_key: String,
    user_agent: String,
    region_code: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("youtube client user agent required");
        }

        let mut base = config
            .base_url
            .unwrap_or_else(|| YOUTUBE_API_BASE.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            api_key: config.api_key.trim().to_string(),
            user_agent: config.user_agent,
            region_code: config.region_code,
            base_url,
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn most_popular(
        &self,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<ListResponse<Video>, CatalogError> {
        let mut params = vec![
            ("part", VIDEO_PARTS.to_string()),
            ("chart", "mostPopular".to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if !self.region_code.is_empty() {
            params.push(("regionCode", self.region_code.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.get("videos", params).map_err(CatalogError::from)
    }

    pub fn videos_by_id(&self, ids: &[String]) -> Result<ListResponse<Video>, CatalogError> {
        let params = vec![("part", VIDEO_PARTS.to_string()), ("id", ids.join(","))];
        self.get("videos", params).map_err(CatalogError::from)
    }

    pub fn search(&self, params: SearchParams) -> Result<ListResponse<SearchResult>, CatalogError> {
        self.get("search", params.into_params())
            .map_err(CatalogError::from)
    }

    pub fn comment_threads(
        &self,
        video_id: &str,
        order: CommentOrder,
        max_results: u32,
    ) -> Result<ListResponse<CommentThread>, CatalogError> {
        let params = vec![
            ("part", "snippet".to_string()),
            ("videoId", video_id.to_string()),
            ("order", order.as_str().to_string()),
            ("maxResults", max_results.to_string()),
            ("textFormat", "plainText".to_string()),
        ];
        match self.get("commentThreads", params) {
            Ok(listing) => Ok(listing),
            Err(Failure::Status { reason, .. }) if reason.as_deref() == Some("commentsDisabled") => {
                debug!(video_id, "comments disabled");
                Ok(ListResponse::default())
            }
            Err(failure) => Err(failure.into()),
        }
    }

    fn get<T>(&self, endpoint: &str, mut params: Vec<(&'static str, String)>) -> Result<T, Failure>
    where
        T: DeserializeOwned,
    {
        if self.api_key.is_empty() {
            return Err(Failure::MissingKey);
        }
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|err| Failure::Decode(format!("build {endpoint} url: {err}")))?;
        debug!(endpoint, "catalog request");
        params.push(("key", self.api_key.clone()));

        let response = self
            .http
            .get(url)
            .query(&params)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(Failure::Transport)?;

        let status = response.status();
        let body = response.text().map_err(Failure::Transport)?;
        if !status.is_success() {
            let failure = Failure::from_error_body(status, &body);
            warn!(endpoint, status = status.as_u16(), "catalog request rejected");
            return Err(failure);
        }

        serde_json::from_str(&body)
            .map_err(|err| Failure::Decode(format!("decode {endpoint} response: {err}")))
    }
}

#[derive(Debug)]
enum Failure {
    MissingKey,
    Transport(reqwest::Error),
    Status {
        status: StatusCode,
        reason: Option<String>,
        message: String,
    },
    Decode(String),
}

impl Failure {
    fn from_error_body(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
        let (reason, message) = match parsed {
            Some(envelope) => {
                let reason = envelope
                    .error
                    .errors
                    .iter()
                    .map(|detail| detail.reason.clone())
                    .find(|reason| !reason.is_empty());
                (reason, envelope.error.message)
            }
            None => (None, String::new()),
        };
        Failure::Status {
            status,
            reason,
            message,
        }
    }
}

impl From<Failure> for CatalogError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::MissingKey => CatalogError::Config(format!(
                "no API key configured; set {API_KEY_ENV} to a YouTube Data API v3 key"
            )),
            Failure::Transport(err) => {
                if err.is_timeout() {
                    CatalogError::Upstream("request timed out".to_string())
                } else if err.is_connect() {
                    CatalogError::Upstream(format!("connection failed: {err}"))
                } else {
                    CatalogError::Upstream(err.to_string())
                }
            }
            Failure::Status {
                status,
                reason,
                message,
            } => classify_status(status, reason.as_deref(), &message),
            Failure::Decode(message) => CatalogError::Upstream(message),
        }
    }
}

fn classify_status(status: StatusCode, reason: Option<&str>, message: &str) -> CatalogError {
    let detail = if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), message)
    };

    let credential_reason = reason.is_some_and(|reason| CREDENTIAL_REASONS.contains(&reason));
    let mentions_key = message.to_ascii_lowercase().contains("api key");
    match status {
        StatusCode::UNAUTHORIZED => CatalogError::Config(detail),
        StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN if credential_reason || mentions_key => {
            CatalogError::Config(detail)
        }
        _ => CatalogError::Upstream(detail),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_page_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub snippet: Snippet,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: BTreeMap<String, Thumbnail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub view_count: Option<String>,
    #[serde(default)]
    pub like_count: Option<String>,
    #[serde(default)]
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: SearchId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchId {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    pub id: String,
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub top_level_comment: TopLevelComment,
    #[serde(default)]
    pub total_reply_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopLevelComment {
    pub id: String,
    pub snippet: CommentSnippet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub author_display_name: String,
    #[serde(default)]
    pub text_display: String,
    #[serde(default)]
    pub text_original: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub published_at: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}
