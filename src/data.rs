use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::youtube::{self, CommentOrder, SearchParams, VideoDuration};

pub const TRENDING_PAGE_SIZE: u32 = 24;
pub const SHORTS_PAGE_SIZE: u32 = 20;
pub const COMMENT_PAGE_SIZE: u32 = 20;
const SHORTS_QUERY: &str = "shorts";

/// Thumbnail tiers from the largest rendition down.
const THUMBNAIL_PREFERENCE: [&str; 5] = ["maxres", "standard", "high", "medium", "default"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog not configured: {0}")]
    Config(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("catalog request failed: {0}")]
    Upstream(String),
    #[error("video not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    pub fn is_config(&self) -> bool {
        matches!(self, CatalogError::Config(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub channel_id: String,
    pub published_at: String,
    pub thumbnails: BTreeMap<String, youtube::Thumbnail>,
    pub statistics: Option<youtube::Statistics>,
}

impl VideoSummary {
    pub fn best_thumbnail(&self) -> Option<&youtube::Thumbnail> {
        THUMBNAIL_PREFERENCE
            .iter()
            .find_map(|tier| self.thumbnails.get(*tier))
            .or_else(|| self.thumbnails.values().next())
    }

    pub fn view_count(&self) -> Option<&str> {
        self.statistics
            .as_ref()
            .and_then(|stats| stats.view_count.as_deref())
    }

    pub fn like_count(&self) -> Option<&str> {
        self.statistics
            .as_ref()
            .and_then(|stats| stats.like_count.as_deref())
    }
}

impl From<youtube::Video> for VideoSummary {
    fn from(video: youtube::Video) -> Self {
        let snippet = video.snippet;
        Self {
            id: video.id,
            title: snippet.title,
            description: snippet.description,
            channel_title: snippet.channel_title,
            channel_id: snippet.channel_id,
            published_at: snippet.published_at,
            thumbnails: snippet.thumbnails,
            statistics: video.statistics,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    pub items: Vec<VideoSummary>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub like_count: i64,
    pub reply_count: i64,
    pub published_at: String,
}

impl From<youtube::CommentThread> for Comment {
    fn from(thread: youtube::CommentThread) -> Self {
        let top = thread.snippet.top_level_comment;
        let text = if top.snippet.text_original.trim().is_empty() {
            top.snippet.text_display
        } else {
            top.snippet.text_original
        };
        Self {
            id: top.id,
            author: top.snippet.author_display_name,
            text,
            like_count: top.snippet.like_count,
            reply_count: thread.snippet.total_reply_count,
            published_at: top.snippet.published_at,
        }
    }
}

pub trait CatalogService: Send + Sync {
    fn fetch_trending(&self, page_token: Option<&str>) -> Result<FeedPage, CatalogError>;
    fn fetch_by_query(&self, query: &str, page_token: Option<&str>)
        -> Result<FeedPage, CatalogError>;
    fn fetch_by_id(&self, id: &str) -> Result<VideoSummary, CatalogError>;
    fn fetch_shorts(&self, page_token: Option<&str>) -> Result<FeedPage, CatalogError>;
    fn fetch_channel(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<FeedPage, CatalogError>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, video_id: &str, order: CommentOrder)
        -> Result<Vec<Comment>, CatalogError>;
}

pub struct YouTubeCatalogService {
    client: Arc<youtube::Client>,
    page_size: u32,
}

impl YouTubeCatalogService {
    pub fn new(client: Arc<youtube::Client>, page_size: u32) -> Self {
        Self {
            client,
            page_size: if page_size == 0 {
                TRENDING_PAGE_SIZE
            } else {
                page_size
            },
        }
    }

    /// Runs a search for ids, then fetches full metadata for them. The search
    /// endpoint carries no statistics, and the metadata endpoint does not keep
    /// the search ranking, so results are re-ordered by the search order.
    fn search_then_hydrate(&self, params: SearchParams) -> Result<FeedPage, CatalogError> {
        let listing = self.client.search(params)?;
        let mut ids: Vec<String> = Vec::new();
        for result in listing.items {
            if let Some(id) = result.id.video_id.filter(|id| !id.is_empty()) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        if ids.is_empty() {
            return Ok(FeedPage {
                items: Vec::new(),
                next_page_token: listing.next_page_token,
            });
        }

        let metadata = self.client.videos_by_id(&ids)?;
        let mut by_id: HashMap<String, VideoSummary> = metadata
            .items
            .into_iter()
            .map(|video| (video.id.clone(), VideoSummary::from(video)))
            .collect();
        let items = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        Ok(FeedPage {
            items,
            next_page_token: listing.next_page_token,
        })
    }
}

impl CatalogService for YouTubeCatalogService {
    fn fetch_trending(&self, page_token: Option<&str>) -> Result<FeedPage, CatalogError> {
        let listing = self.client.most_popular(page_token, self.page_size)?;
        Ok(FeedPage {
            items: listing.items.into_iter().map(VideoSummary::from).collect(),
            next_page_token: listing.next_page_token,
        })
    }

    fn fetch_by_query(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FeedPage, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "search query is empty".to_string(),
            ));
        }
        self.search_then_hydrate(SearchParams {
            query: Some(query.to_string()),
            page_token: page_token.map(str::to_string),
            max_results: self.page_size,
            ..SearchParams::default()
        })
    }

    fn fetch_by_id(&self, id: &str) -> Result<VideoSummary, CatalogError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CatalogError::InvalidArgument("video id is empty".to_string()));
        }
        let listing = self.client.videos_by_id(&[id.to_string()])?;
        listing
            .items
            .into_iter()
            .next()
            .map(VideoSummary::from)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    fn fetch_shorts(&self, page_token: Option<&str>) -> Result<FeedPage, CatalogError> {
        self.search_then_hydrate(SearchParams {
            query: Some(SHORTS_QUERY.to_string()),
            duration: VideoDuration::Short,
            page_token: page_token.map(str::to_string),
            max_results: SHORTS_PAGE_SIZE,
            ..SearchParams::default()
        })
    }

    fn fetch_channel(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<FeedPage, CatalogError> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "channel id is empty".to_string(),
            ));
        }
        self.search_then_hydrate(SearchParams {
            channel_id: Some(channel_id.to_string()),
            order: Some("date"),
            page_token: page_token.map(str::to_string),
            max_results: self.page_size,
            ..SearchParams::default()
        })
    }
}

impl CommentService for YouTubeCatalogService {
    fn load_comments(
        &self,
        video_id: &str,
        order: CommentOrder,
    ) -> Result<Vec<Comment>, CatalogError> {
        if video_id.trim().is_empty() {
            return Err(CatalogError::InvalidArgument("video id is empty".to_string()));
        }
        let listing = self
            .client
            .comment_threads(video_id.trim(), order, COMMENT_PAGE_SIZE)?;
        Ok(listing.items.into_iter().map(Comment::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubServer;
    use crate::youtube::ClientConfig;

    fn service_for(server: &StubServer) -> YouTubeCatalogService {
        let client = youtube::Client::new(ClientConfig {
            api_key: "test-key".into(),
            base_url: Some(server.base_url()),
            user_agent: "tube-tui-test".into(),
            region_code: "US".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        YouTubeCatalogService::new(Arc::new(client), TRENDING_PAGE_SIZE)
    }

    fn video_json(id: &str, views: &str) -> String {
        format!(
            r#"{{"id":"{id}","snippet":{{"title":"Title {id}","description":"d","channelTitle":"Chan","channelId":"UC1","publishedAt":"2024-01-02T03:04:05Z","thumbnails":{{"high":{{"url":"https://i.ytimg.com/vi/{id}/hqdefault.jpg","width":480,"height":360}}}}}},"statistics":{{"viewCount":"{views}","likeCount":"7"}}}}"#
        )
    }

    #[test]
    fn trending_normalizes_items_and_token() {
        let body = format!(
            r#"{{"items":[{},{}],"nextPageToken":"T1"}}"#,
            video_json("a", "10"),
            video_json("b", "20")
        );
        let server = StubServer::start(move |_| (200, body.clone()));
        let page = service_for(&server).fetch_trending(None).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("T1"));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].channel_title, "Chan");
        assert_eq!(page.items[1].view_count(), Some("20"));
        assert_eq!(
            page.items[0].best_thumbnail().map(|thumb| thumb.url.as_str()),
            Some("https://i.ytimg.com/vi/a/hqdefault.jpg")
        );
    }

    #[test]
    fn empty_query_is_rejected_before_any_request() {
        let server = StubServer::start(|_| (200, "{}".into()));
        let err = service_for(&server).fetch_by_query("   ", None).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument(_)));
        assert!(server.hits().is_empty());
    }

    #[test]
    fn query_results_keep_search_ranking() {
        let search = r#"{"items":[{"id":{"kind":"youtube#video","videoId":"c"}},{"id":{"kind":"youtube#video","videoId":"a"}},{"id":{"kind":"youtube#video","videoId":"b"}}],"nextPageToken":"S2"}"#;
        let videos = format!(
            r#"{{"items":[{},{},{}]}}"#,
            video_json("a", "1"),
            video_json("b", "2"),
            video_json("c", "3")
        );
        let server = StubServer::start(move |url| {
            if url.starts_with("/search") {
                (200, search.to_string())
            } else {
                (200, videos.clone())
            }
        });
        let page = service_for(&server).fetch_by_query("rust", None).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|video| video.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(page.next_page_token.as_deref(), Some("S2"));

        let hits = server.hits();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].contains("q=rust"));
        assert!(hits[1].contains("id=c%2Ca%2Cb"), "hit was {}", hits[1]);
    }

    #[test]
    fn query_without_matches_skips_metadata_lookup() {
        let server = StubServer::start(|_| (200, r#"{"items":[]}"#.into()));
        let page = service_for(&server).fetch_by_query("zzzz", None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
        assert_eq!(server.hits().len(), 1);
    }

    #[test]
    fn missing_video_is_not_found() {
        let server = StubServer::start(|_| (200, r#"{"items":[]}"#.into()));
        let err = service_for(&server).fetch_by_id("nope").unwrap_err();
        assert_eq!(err, CatalogError::NotFound("nope".into()));
    }

    #[test]
    fn shorts_request_short_duration_search() {
        let server = StubServer::start(|_| (200, r#"{"items":[]}"#.into()));
        service_for(&server).fetch_shorts(None).unwrap();
        let hits = server.hits();
        assert!(hits[0].contains("videoDuration=short"));
        assert!(hits[0].contains("maxResults=20"));
    }

    #[test]
    fn comments_are_flattened() {
        let body = r#"{"items":[{"id":"t1","snippet":{"totalReplyCount":3,"topLevelComment":{"id":"c1","snippet":{"authorDisplayName":"Ann","textDisplay":"<b>hi</b>","textOriginal":"hi","likeCount":12,"publishedAt":"2024-05-01T00:00:00Z"}}}}]}"#;
        let server = StubServer::start(move |_| (200, body.into()));
        let comments = service_for(&server)
            .load_comments("vid", CommentOrder::Relevance)
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "Ann");
        assert_eq!(comments[0].text, "hi");
        assert_eq!(comments[0].reply_count, 3);
    }
}
