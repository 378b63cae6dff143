//! Timed-text transcript fetcher.
//!
//! The endpoint returns `<transcript><text start=".." dur="..">..</text></transcript>`.
//! Caption lines may carry escaped inline markup (`&lt;font ...&gt;`), which
//! is stripped after unescaping.

use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::{Client, Url};

use crate::error::CollectorError;
use crate::http::{build_client, get_checked, parse_base_url};

const DEFAULT_BASE_URL: &str = "https://www.youtube.com/api/";

/// Transcripts are cut to this many characters.
pub const MAX_TRANSCRIPT_CHARS: usize = 8_000;

/// Caption languages tried in order.
const LANGUAGES: [&str; 2] = ["es", "en"];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

pub struct TranscriptFetcher {
    client: Client,
    base_url: Url,
}

impl TranscriptFetcher {
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, CollectorError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// As [`TranscriptFetcher::new`], plus [`CollectorError::InvalidBaseUrl`].
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Plain-text transcript for `video_id`, or an empty string when no
    /// captions could be fetched.
    pub async fn fetch(&self, video_id: &str) -> String {
        for lang in LANGUAGES {
            match self.fetch_lang(video_id, lang).await {
                Ok(text) if !text.is_empty() => return text,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(video_id, lang, error = %e, "transcript fetch failed");
                }
            }
        }
        String::new()
    }

    async fn fetch_lang(&self, video_id: &str, lang: &str) -> Result<String, CollectorError> {
        let mut url = self
            .base_url
            .join("timedtext")
            .map_err(|e| CollectorError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("lang", lang)
            .append_pair("v", video_id);

        let body = get_checked(&self.client, &url).await?.text().await?;
        Ok(transcript_text(&body))
    }
}

/// Extracts caption text from a timed-text document, strips markup, collapses
/// whitespace and truncates to [`MAX_TRANSCRIPT_CHARS`].
///
/// Bodies that are not well-formed XML fall back to tag stripping.
#[must_use]
pub fn transcript_text(body: &str) -> String {
    let raw = caption_lines(body).unwrap_or_else(|_| body.to_owned());
    let stripped = TAG_RE.replace_all(&raw, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_TRANSCRIPT_CHARS)
}

fn caption_lines(xml: &str) -> Result<String, CollectorError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<String> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                lines.push(e.unescape().unwrap_or_default().into_owned());
            }
            Ok(Event::CData(e)) => {
                lines.push(String::from_utf8_lossy(&e).into_owned());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CollectorError::Xml(e)),
            _ => {}
        }
    }
    Ok(lines.join(" "))
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}
