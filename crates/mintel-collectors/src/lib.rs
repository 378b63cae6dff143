//! Enrichment collectors: `YouTube` Data API, timed-text transcripts and
//! public Instagram profiles.

pub mod enrich;
pub mod error;
pub(crate) mod http;
pub mod instagram;
pub(crate) mod retry;
pub mod transcript;
pub mod youtube;

pub use enrich::{Enricher, TRANSCRIPT_TOP_N};
pub use error::CollectorError;
pub use instagram::{username_from_url, InstagramScraper, MAX_POSTS};
pub use transcript::{transcript_text, TranscriptFetcher, MAX_TRANSCRIPT_CHARS};
pub use youtube::{ChannelRef, YouTubeClient, RECENT_VIDEO_LIMIT};
