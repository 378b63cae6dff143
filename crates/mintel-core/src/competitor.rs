//! Enriched competitor snapshots stored on a research request.

use serde::{Deserialize, Serialize};

use crate::Platform;

/// One piece of published content (video, reel, post).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub creator: String,
    #[serde(default, alias = "id")]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "url")]
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    /// Raw platform encoding (ISO-8601 duration for `YouTube`), never parsed.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

/// Platform snapshot for one competitor reference.
///
/// A snapshot with zero followers and no items is still valid input; it means
/// the source had nothing usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCompetitor {
    pub platform: Platform,
    /// The reference exactly as the user submitted it.
    pub source_url: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_url: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub avg_views: u64,
    #[serde(default)]
    pub videos: Vec<ContentItem>,
}

impl EnrichedCompetitor {
    /// An empty snapshot for a reference whose source yielded nothing.
    #[must_use]
    pub fn empty(platform: Platform, source_url: impl Into<String>) -> Self {
        Self {
            platform,
            source_url: source_url.into(),
            channel_id: None,
            channel_url: None,
            handle: None,
            name: String::new(),
            bio: String::new(),
            followers: 0,
            avg_views: 0,
            videos: Vec::new(),
        }
    }

    /// Whether any real signal was collected for this competitor.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.followers > 0
            || self.avg_views > 0
            || !self.videos.is_empty()
            || !self.name.is_empty()
            || !self.bio.is_empty()
    }

    /// Rounded mean of item views, 0 when there are no items.
    #[must_use]
    pub fn average_views(items: &[ContentItem]) -> u64 {
        if items.is_empty() {
            return 0;
        }
        let total: u128 = items.iter().map(|v| u128::from(v.views)).sum();
        let count = items.len() as u128;
        u64::try_from((total + count / 2) / count).unwrap_or(u64::MAX)
    }
}

/// Flattens every competitor's items and orders them by views, highest first.
///
/// Ties keep the competitor order so the result is deterministic regardless
/// of the order enrichment finished in.
#[must_use]
pub fn top_items_by_views(competitors: &[EnrichedCompetitor], limit: usize) -> Vec<ContentItem> {
    let mut items: Vec<ContentItem> = competitors
        .iter()
        .flat_map(|c| c.videos.iter().cloned())
        .collect();
    items.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.video_id.cmp(&b.video_id)));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, views: u64) -> ContentItem {
        ContentItem {
            video_id: id.to_string(),
            views,
            ..ContentItem::default()
        }
    }

    #[test]
    fn average_views_rounds_and_handles_empty() {
        assert_eq!(EnrichedCompetitor::average_views(&[]), 0);
        assert_eq!(
            EnrichedCompetitor::average_views(&[item("a", 1), item("b", 2)]),
            2
        );
        assert_eq!(
            EnrichedCompetitor::average_views(&[item("a", 10), item("b", 20), item("c", 31)]),
            20
        );
    }

    #[test]
    fn empty_snapshot_has_no_signal() {
        let snap = EnrichedCompetitor::empty(Platform::Instagram, "https://instagram.com/x");
        assert!(!snap.has_signal());
        assert_eq!(snap.followers, 0);
        assert!(snap.videos.is_empty());
    }

    #[test]
    fn top_items_sorts_across_competitors() {
        let mut a = EnrichedCompetitor::empty(Platform::Youtube, "https://youtube.com/@a");
        a.videos = vec![item("a1", 50), item("a2", 500)];
        let mut b = EnrichedCompetitor::empty(Platform::Youtube, "https://youtube.com/@b");
        b.videos = vec![item("b1", 300), item("b2", 5)];

        let top = top_items_by_views(&[a, b], 3);
        let ids: Vec<&str> = top.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, ["a2", "b1", "a1"]);
    }

    #[test]
    fn snapshot_deserializes_with_missing_optional_fields() {
        let json = serde_json::json!({
            "platform": "youtube",
            "source_url": "https://youtube.com/@a",
            "videos": [{ "video_id": "x", "views": 7 }]
        });
        let snap: EnrichedCompetitor = serde_json::from_value(json).expect("deserialize");
        assert_eq!(snap.videos[0].views, 7);
        assert!(snap.videos[0].transcript.is_none());
        assert!(snap.has_signal());
    }
}
