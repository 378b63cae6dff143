//! Research request vocabulary: platforms, timeframes and the status machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Fewest competitor references a request may carry.
pub const MIN_COMPETITORS: usize = 1;
/// Most competitor references a request may carry.
pub const MAX_COMPETITORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
        }
    }

    /// Whether the enrichment and prompting stages can process this platform.
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(self, Platform::Youtube | Platform::Instagram)
    }

    /// Registrable domains whose URLs count as references on this platform.
    #[must_use]
    pub fn domains(self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["youtube.com", "youtu.be"],
            Platform::Instagram => &["instagram.com"],
            Platform::Tiktok => &["tiktok.com"],
        }
    }

    /// Human-readable label used in prompts.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Analysis window. Only 30, 60 and 90 days exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub enum TimeframeDays {
    Thirty,
    Sixty,
    Ninety,
}

impl TimeframeDays {
    #[must_use]
    pub fn days(self) -> i32 {
        match self {
            TimeframeDays::Thirty => 30,
            TimeframeDays::Sixty => 60,
            TimeframeDays::Ninety => 90,
        }
    }
}

impl TryFrom<i64> for TimeframeDays {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            30 => Ok(TimeframeDays::Thirty),
            60 => Ok(TimeframeDays::Sixty),
            90 => Ok(TimeframeDays::Ninety),
            other => Err(CoreError::InvalidTimeframe(other)),
        }
    }
}

impl From<TimeframeDays> for i32 {
    fn from(value: TimeframeDays) -> Self {
        value.days()
    }
}

/// Lifecycle of a research request.
///
/// `pending -> processing -> completed | failed`. Terminal states never
/// change again and `pending` can only leave through a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Processing)
                | (
                    RequestStatus::Processing,
                    RequestStatus::Completed | RequestStatus::Failed
                )
        )
    }

    /// Checks a transition and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] for any edge outside the
    /// lifecycle graph.
    pub fn transition(self, next: RequestStatus) -> Result<RequestStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "processing" => Ok(RequestStatus::Processing),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("YouTube".parse::<Platform>(), Ok(Platform::Youtube));
        assert_eq!(" instagram ".parse::<Platform>(), Ok(Platform::Instagram));
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn tiktok_is_known_but_not_supported() {
        let p: Platform = "tiktok".parse().expect("parse");
        assert!(!p.is_supported());
        assert!(Platform::Youtube.is_supported());
    }

    #[test]
    fn timeframe_accepts_only_known_windows() {
        for days in [30, 60, 90] {
            let tf = TimeframeDays::try_from(days).expect("valid timeframe");
            assert_eq!(i64::from(tf.days()), days);
        }
        for days in [0, 29, 31, 45, 120, -30] {
            assert_eq!(
                TimeframeDays::try_from(days),
                Err(CoreError::InvalidTimeframe(days))
            );
        }
    }

    #[test]
    fn timeframe_deserializes_from_json_number() {
        let tf: TimeframeDays = serde_json::from_str("60").expect("deserialize");
        assert_eq!(tf, TimeframeDays::Sixty);
        assert!(serde_json::from_str::<TimeframeDays>("61").is_err());
    }

    #[test]
    fn lifecycle_allows_only_forward_edges() {
        use RequestStatus::{Completed, Failed, Pending, Processing};

        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Pending));
        for terminal in [Completed, Failed] {
            for next in [Pending, Processing, Completed, Failed] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn transition_reports_the_rejected_edge() {
        let err = RequestStatus::Completed
            .transition(RequestStatus::Processing)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid status transition completed -> processing"
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in ["pending", "processing", "completed", "failed"] {
            let status: RequestStatus = s.parse().expect("parse");
            assert_eq!(status.as_str(), s);
        }
        assert!("queued".parse::<RequestStatus>().is_err());
    }
}
