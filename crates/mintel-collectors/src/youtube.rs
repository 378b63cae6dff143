//! `YouTube` Data API v3 collector.
//!
//! Resolves a channel reference, then fetches channel snippet + statistics,
//! the 10 most recent uploads and per-video statistics.

use std::sync::LazyLock;

use mintel_core::{ContentItem, EnrichedCompetitor, Platform};
use regex::Regex;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CollectorError;
use crate::http::{build_client, get_checked, parse_base_url};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const USER_AGENT: &str = "mintel/0.1 (market-intelligence)";

/// Most recent uploads fetched per channel.
pub const RECENT_VIDEO_LIMIT: usize = 10;

static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"channel/([^/?#]+)").expect("valid regex"));
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^/?#]+)").expect("valid regex"));
static LEGACY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:c|user)/([^/?#]+)").expect("valid regex"));

/// What a competitor URL says about the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `/channel/UC...`: usable directly.
    Id(String),
    /// `/@handle`, or a legacy `/c/` or `/user/` name: needs a search.
    Handle(String),
    /// Nothing recognisable (for example a single video link).
    Unknown,
}

impl ChannelRef {
    /// An explicit channel id wins over a handle when both appear.
    #[must_use]
    pub fn parse(url: &str) -> Self {
        if let Some(c) = CHANNEL_ID_RE.captures(url) {
            return ChannelRef::Id(c[1].to_string());
        }
        if let Some(c) = HANDLE_RE.captures(url) {
            return ChannelRef::Handle(c[1].to_string());
        }
        if let Some(c) = LEGACY_NAME_RE.captures(url) {
            return ChannelRef::Handle(c[1].to_string());
        }
        ChannelRef::Unknown
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    channel_id: Option<String>,
    title: String,
    description: String,
    custom_url: Option<String>,
    published_at: Option<String>,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    /// maxres, then high, then medium, then default.
    fn best(&self) -> Option<String> {
        [&self.maxres, &self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url.clone())
            .next()
    }
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChannelStatistics {
    subscriber_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: VideoStatistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentDetails {
    duration: Option<String>,
}

/// The API encodes counts as decimal strings.
fn count(raw: Option<&String>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the `YouTube` Data API.
///
/// Use [`YouTubeClient::new`] for production or
/// [`YouTubeClient::with_base_url`] to point at a mock server in tests.
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl YouTubeClient {
    /// # Errors
    ///
    /// Returns [`CollectorError::MissingApiKey`] when no key is configured,
    /// or [`CollectorError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: Option<&str>, timeout_secs: u64) -> Result<Self, CollectorError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// As [`YouTubeClient::new`], plus [`CollectorError::InvalidBaseUrl`].
    pub fn with_base_url(
        api_key: Option<&str>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, CollectorError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(CollectorError::MissingApiKey("YOUTUBE_API_KEY"))?;
        Ok(Self {
            client: build_client(timeout_secs, USER_AGENT)?,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
            max_retries: 2,
            backoff_base_ms: 500,
        })
    }

    /// Overrides the transient-error retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, CollectorError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| CollectorError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, CollectorError> {
        let url = self.build_url(endpoint, params)?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let body = get_checked(&self.client, &url).await?.text().await?;
                let parsed: ListResponse<T> =
                    serde_json::from_str(&body).map_err(|e| CollectorError::Deserialize {
                        context: format!("youtube {endpoint}"),
                        source: e,
                    })?;
                Ok::<_, CollectorError>(parsed.items)
            }
        })
        .await
    }

    /// Resolves a channel reference to a canonical channel id.
    ///
    /// Handles are looked up through a channel search; `None` means the
    /// search found nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`CollectorError`] when the search request fails.
    pub async fn resolve_channel_id(
        &self,
        channel: &ChannelRef,
    ) -> Result<Option<String>, CollectorError> {
        let handle = match channel {
            ChannelRef::Id(id) => return Ok(Some(id.clone())),
            ChannelRef::Unknown => return Ok(None),
            ChannelRef::Handle(handle) => handle,
        };
        let items: Vec<SearchItem> = self
            .get_list(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("maxResults", "1"),
                    ("q", handle),
                ],
            )
            .await?;
        Ok(items
            .into_iter()
            .next()
            .and_then(|item| item.snippet.channel_id.or(item.id.channel_id)))
    }

    /// Builds the full snapshot for one channel reference.
    ///
    /// An unresolvable reference yields an empty snapshot, not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`CollectorError`] when any API request fails.
    pub async fn fetch_competitor(
        &self,
        source_url: &str,
    ) -> Result<EnrichedCompetitor, CollectorError> {
        let mut snapshot = EnrichedCompetitor::empty(Platform::Youtube, source_url);
        let channel_ref = ChannelRef::parse(source_url);
        if let ChannelRef::Handle(h) = &channel_ref {
            snapshot.handle = Some(format!("@{h}"));
        }

        let Some(channel_id) = self.resolve_channel_id(&channel_ref).await? else {
            tracing::info!(url = %source_url, "youtube: could not resolve a channel id");
            return Ok(snapshot);
        };
        snapshot.channel_url = Some(format!("https://www.youtube.com/channel/{channel_id}"));

        let channels: Vec<ChannelItem> = self
            .get_list(
                "channels",
                &[("part", "snippet,statistics"), ("id", &channel_id)],
            )
            .await?;
        if let Some(channel) = channels.into_iter().next() {
            snapshot.name = channel.snippet.title;
            snapshot.bio = channel.snippet.description;
            snapshot.followers = count(channel.statistics.subscriber_count.as_ref());
            if snapshot.handle.is_none() {
                snapshot.handle = channel.snippet.custom_url;
            }
            snapshot.channel_id = Some(channel.id);
        } else {
            snapshot.channel_id = Some(channel_id.clone());
        }

        let limit = RECENT_VIDEO_LIMIT.to_string();
        let recent: Vec<SearchItem> = self
            .get_list(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", &channel_id),
                    ("order", "date"),
                    ("type", "video"),
                    ("maxResults", &limit),
                ],
            )
            .await?;
        let ids: Vec<String> = recent
            .iter()
            .filter_map(|item| item.id.video_id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(snapshot);
        }

        let videos: Vec<VideoItem> = self
            .get_list(
                "videos",
                &[
                    ("part", "statistics,contentDetails,snippet"),
                    ("id", &ids.join(",")),
                ],
            )
            .await?;

        snapshot.videos = videos
            .into_iter()
            .map(|video| {
                let search_snippet = recent
                    .iter()
                    .find(|item| item.id.video_id.as_deref() == Some(video.id.as_str()))
                    .map(|item| &item.snippet);
                let title = search_snippet
                    .map(|s| s.title.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| video.snippet.title.clone());
                let thumbnail_url = video
                    .snippet
                    .thumbnails
                    .best()
                    .or_else(|| search_snippet.and_then(|s| s.thumbnails.best()));
                ContentItem {
                    creator: snapshot.name.clone(),
                    video_url: format!("https://www.youtube.com/watch?v={}", video.id),
                    title,
                    thumbnail_url,
                    views: count(video.statistics.view_count.as_ref()),
                    likes: count(video.statistics.like_count.as_ref()),
                    comments: count(video.statistics.comment_count.as_ref()),
                    duration: video.content_details.duration,
                    published_at: video.snippet.published_at,
                    transcript: None,
                    video_id: video.id,
                }
            })
            .collect();
        snapshot.avg_views = EnrichedCompetitor::average_views(&snapshot.videos);

        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "youtube_test.rs"]
mod tests;
