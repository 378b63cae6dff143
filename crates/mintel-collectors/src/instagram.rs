//! Public Instagram profile scraper.
//!
//! Instagram has no public metrics API, so this reads the profile page's meta
//! description for follower count and bio and harvests post permalinks from
//! the markup. Likes, comments and views are not visible and stay at zero.

use std::collections::HashSet;
use std::sync::LazyLock;

use mintel_core::{ContentItem, EnrichedCompetitor, Platform};
use regex::Regex;
use reqwest::{Client, Url};

use crate::error::CollectorError;
use crate::http::{build_client, get_checked, parse_base_url};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://www.instagram.com/";

/// Posts harvested per profile.
pub const MAX_POSTS: usize = 9;

static META_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]*?(?:property|name)\s*=\s*["'](?:og:description|description)["'][^>]*?content\s*=\s*"([^"]*)""#,
    )
    .expect("valid regex")
});
static META_DESCRIPTION_REVERSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]*?content\s*=\s*"([^"]*)"[^>]*?(?:property|name)\s*=\s*["'](?:og:description|description)["']"#,
    )
    .expect("valid regex")
});
static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*?property\s*=\s*["']og:title["'][^>]*?content\s*=\s*"([^"]*)""#)
        .expect("valid regex")
});
static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d][\d.,]*)\s*([KM]?)\s+Followers").expect("valid regex")
});
static PERMALINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(p|reel)/([A-Za-z0-9_-]+)").expect("valid regex"));

pub struct InstagramScraper {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl InstagramScraper {
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, CollectorError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// As [`InstagramScraper::new`], plus [`CollectorError::InvalidBaseUrl`].
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url)?,
            max_retries: 1,
            backoff_base_ms: 500,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Scrapes the profile behind `source_url`.
    ///
    /// Never fails: a blocked, missing or unparseable page yields a zeroed
    /// snapshot.
    pub async fn scrape_profile(&self, source_url: &str) -> EnrichedCompetitor {
        match self.fetch_profile(source_url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    url = %source_url,
                    error = %e,
                    "instagram: profile fetch failed, using empty snapshot"
                );
                let mut snapshot = EnrichedCompetitor::empty(Platform::Instagram, source_url);
                snapshot.handle = username_from_url(source_url).map(|u| format!("@{u}"));
                snapshot
            }
        }
    }

    /// # Errors
    ///
    /// Returns a [`CollectorError`] when the page cannot be fetched.
    pub async fn fetch_profile(
        &self,
        source_url: &str,
    ) -> Result<EnrichedCompetitor, CollectorError> {
        let mut snapshot = EnrichedCompetitor::empty(Platform::Instagram, source_url);
        let Some(username) = username_from_url(source_url) else {
            tracing::info!(url = %source_url, "instagram: no username in URL");
            return Ok(snapshot);
        };

        let url = self
            .base_url
            .join(&format!("{username}/"))
            .map_err(|e| CollectorError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        let html = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let body = get_checked(&self.client, &url).await?.text().await?;
                Ok::<_, CollectorError>(body)
            }
        })
        .await?;

        let profile = parse_profile_page(&html);
        snapshot.handle = Some(format!("@{username}"));
        snapshot.channel_url = Some(format!("https://www.instagram.com/{username}/"));
        snapshot.name = profile.name.unwrap_or_default();
        snapshot.bio = profile.bio;
        snapshot.followers = profile.followers;
        snapshot.videos = profile
            .posts
            .into_iter()
            .map(|(kind, code)| ContentItem {
                creator: snapshot.name.clone(),
                video_url: format!("https://www.instagram.com/{kind}/{code}/"),
                video_id: code,
                ..ContentItem::default()
            })
            .collect();
        Ok(snapshot)
    }
}

/// First path segment of an Instagram profile URL.
#[must_use]
pub fn username_from_url(source_url: &str) -> Option<String> {
    let url = Url::parse(source_url.trim()).ok()?;
    let segment = url.path_segments()?.find(|s| !s.is_empty())?;
    if matches!(segment, "p" | "reel" | "reels" | "explore" | "stories") {
        return None;
    }
    Some(segment.trim_start_matches('@').to_owned())
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct ProfilePage {
    pub(crate) name: Option<String>,
    pub(crate) bio: String,
    pub(crate) followers: u64,
    pub(crate) posts: Vec<(String, String)>,
}

pub(crate) fn parse_profile_page(html: &str) -> ProfilePage {
    let description = META_DESCRIPTION_RE
        .captures(html)
        .or_else(|| META_DESCRIPTION_REVERSED_RE.captures(html))
        .map(|c| decode_entities(&c[1]))
        .unwrap_or_default();

    let name = OG_TITLE_RE
        .captures(html)
        .map(|c| decode_entities(&c[1]))
        .and_then(|title| title.split(" (@").next().map(str::trim).map(str::to_owned))
        .filter(|n| !n.is_empty());

    ProfilePage {
        name,
        bio: bio_from_description(&description),
        followers: followers_from_description(&description),
        posts: harvest_permalinks(html),
    }
}

fn decode_entities(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map_or_else(|_| raw.to_owned(), std::borrow::Cow::into_owned)
}

/// Reads `12.5K Followers`, `1,234 Followers` or `3M Followers`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn followers_from_description(description: &str) -> u64 {
    let Some(caps) = FOLLOWERS_RE.captures(description) else {
        return 0;
    };
    let number = &caps[1];
    let multiplier = match caps[2].to_ascii_uppercase().as_str() {
        "K" => 1_000.0,
        "M" => 1_000_000.0,
        _ => {
            let digits: String = number.chars().filter(char::is_ascii_digit).collect();
            return digits.parse().unwrap_or(0);
        }
    };
    let value: f64 = number.replace(',', "").parse().unwrap_or(0.0);
    (value * multiplier).round() as u64
}

/// Bio is whatever follows `on Instagram:`, or failing that the text after
/// the counts section (` - `).
pub(crate) fn bio_from_description(description: &str) -> String {
    let rest = if let Some((_, bio)) = description.split_once("on Instagram:") {
        bio
    } else if let Some((_, bio)) = description.split_once(" - ") {
        bio
    } else {
        return String::new();
    };
    rest.trim().trim_matches('"').trim().to_owned()
}

/// Unique `(kind, shortcode)` pairs in page order, capped at [`MAX_POSTS`].
pub(crate) fn harvest_permalinks(html: &str) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut posts = Vec::new();
    for caps in PERMALINK_RE.captures_iter(html) {
        let code = caps[2].to_owned();
        if seen.insert(code.clone()) {
            posts.push((caps[1].to_owned(), code));
            if posts.len() >= MAX_POSTS {
                break;
            }
        }
    }
    posts
}
