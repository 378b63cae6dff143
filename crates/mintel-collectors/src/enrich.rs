//! Batch enrichment: turns submitted competitor URLs into snapshots.
//!
//! Per-competitor failures are absorbed and logged; only configuration
//! errors (no `YouTube` key for a `YouTube` request) reach the caller.

use futures::future::join_all;
use mintel_core::{top_items_by_views, AppConfig, EnrichedCompetitor, Platform};

use crate::error::CollectorError;
use crate::instagram::InstagramScraper;
use crate::transcript::TranscriptFetcher;
use crate::youtube::YouTubeClient;

/// Items per job that get a transcript attached.
pub const TRANSCRIPT_TOP_N: usize = 3;

pub struct Enricher {
    youtube: Option<YouTubeClient>,
    instagram: InstagramScraper,
    transcripts: TranscriptFetcher,
}

impl Enricher {
    #[must_use]
    pub fn new(
        youtube: Option<YouTubeClient>,
        instagram: InstagramScraper,
        transcripts: TranscriptFetcher,
    ) -> Self {
        Self {
            youtube,
            instagram,
            transcripts,
        }
    }

    /// Builds every collector from configuration. A missing `YouTube` key is
    /// not an error here; it surfaces when a `YouTube` request is enriched.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, CollectorError> {
        let youtube = match YouTubeClient::new(
            config.youtube_api_key.as_deref(),
            config.http_timeout_secs,
        ) {
            Ok(client) => Some(client),
            Err(CollectorError::MissingApiKey(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(Self::new(
            youtube,
            InstagramScraper::new(config.http_timeout_secs, &config.scraper_user_agent)?,
            TranscriptFetcher::new(config.http_timeout_secs, &config.scraper_user_agent)?,
        ))
    }

    fn youtube(&self) -> Result<&YouTubeClient, CollectorError> {
        self.youtube
            .as_ref()
            .ok_or(CollectorError::MissingApiKey("YOUTUBE_API_KEY"))
    }

    /// Checks that the collector `platform` needs is configured.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::MissingApiKey`] for `YouTube` without a key.
    pub fn ensure_configured(&self, platform: Platform) -> Result<(), CollectorError> {
        if platform == Platform::Youtube {
            self.youtube()?;
        }
        Ok(())
    }

    /// Snapshot for one competitor. Fetch failures degrade to an empty
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns a configuration error only; see [`Enricher::ensure_configured`].
    pub async fn enrich_one(
        &self,
        platform: Platform,
        url: &str,
    ) -> Result<EnrichedCompetitor, CollectorError> {
        match platform {
            Platform::Youtube => {
                let client = self.youtube()?;
                Ok(client.fetch_competitor(url).await.unwrap_or_else(|e| {
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        "youtube: enrichment failed, using empty snapshot"
                    );
                    EnrichedCompetitor::empty(platform, url)
                }))
            }
            Platform::Instagram => Ok(self.instagram.scrape_profile(url).await),
            Platform::Tiktok => {
                tracing::warn!(url = %url, "no collector for tiktok, using empty snapshot");
                Ok(EnrichedCompetitor::empty(platform, url))
            }
        }
    }

    /// Enriches every URL concurrently. Output order matches input order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any request is made.
    pub async fn enrich_all(
        &self,
        platform: Platform,
        urls: &[String],
    ) -> Result<Vec<EnrichedCompetitor>, CollectorError> {
        self.ensure_configured(platform)?;
        let results = join_all(urls.iter().map(|url| self.enrich_one(platform, url))).await;
        let snapshots = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let empty = snapshots.iter().filter(|s| !s.has_signal()).count();
        tracing::info!(
            platform = %platform,
            competitors = snapshots.len(),
            empty,
            "enrichment complete"
        );
        Ok(snapshots)
    }

    /// Re-fetches snapshots that carry no signal, leaving the rest as stored.
    ///
    /// # Errors
    ///
    /// Returns a configuration error only.
    pub async fn refresh_empty(
        &self,
        platform: Platform,
        snapshots: Vec<EnrichedCompetitor>,
    ) -> Result<Vec<EnrichedCompetitor>, CollectorError> {
        if snapshots.iter().all(EnrichedCompetitor::has_signal) {
            return Ok(snapshots);
        }
        self.ensure_configured(platform)?;

        let refreshed = join_all(snapshots.into_iter().map(|snap| async move {
            if snap.has_signal() {
                Ok(snap)
            } else {
                self.enrich_one(platform, &snap.source_url).await
            }
        }))
        .await;
        refreshed.into_iter().collect()
    }

    /// Fetches transcripts for the top [`TRANSCRIPT_TOP_N`] `YouTube` items by
    /// views and stores them on the matching items. Returns how many were
    /// attached.
    pub async fn attach_transcripts(&self, snapshots: &mut [EnrichedCompetitor]) -> usize {
        let targets: Vec<String> = top_items_by_views(snapshots, TRANSCRIPT_TOP_N)
            .into_iter()
            .filter(|item| item.transcript.is_none() && !item.video_id.is_empty())
            .map(|item| item.video_id)
            .filter(|id| {
                snapshots.iter().any(|s| {
                    s.platform == Platform::Youtube && s.videos.iter().any(|v| &v.video_id == id)
                })
            })
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let fetched = join_all(targets.iter().map(|id| self.transcripts.fetch(id))).await;

        let mut attached = 0;
        for (id, text) in targets.iter().zip(fetched) {
            if text.is_empty() {
                continue;
            }
            for item in snapshots
                .iter_mut()
                .flat_map(|s| s.videos.iter_mut())
                .filter(|v| &v.video_id == id)
            {
                item.transcript = Some(text.clone());
            }
            attached += 1;
        }
        tracing::debug!(attached, requested = targets.len(), "transcripts attached");
        attached
    }
}

#[cfg(test)]
#[path = "enrich_test.rs"]
mod tests;
