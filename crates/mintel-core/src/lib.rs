//! Shared domain types and configuration for the market-intelligence pipeline.

pub mod app_config;
pub mod competitor;
pub mod config;
pub mod report;
pub mod research;
pub mod validation;

use thiserror::Error;

pub use app_config::{AppConfig, AuthMode, Environment, LlmSettings, WorkerSettings};
pub use competitor::{top_items_by_views, ContentItem, EnrichedCompetitor};
pub use config::{
    build_app_config, load_app_config, load_app_config_from_env, DEFAULT_SCRAPER_USER_AGENT,
};
pub use report::{
    coerce_video_analyses, insights_to_value, MarketOverview, NamedInsight, ResearchReport,
    StrategyReport, VideoAnalysis, MAX_SECTION_ITEMS, MAX_VIDEO_ANALYSES,
};
pub use research::{Platform, RequestStatus, TimeframeDays, MAX_COMPETITORS, MIN_COMPETITORS};
pub use validation::{check_competitor_url, validate_request, ValidatedRequest, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("timeframe must be 30, 60 or 90 days, got {0}")]
    InvalidTimeframe(i64),

    #[error("unknown request status: {0}")]
    UnknownStatus(String),

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("report section '{section}' has the wrong shape: {reason}")]
    ReportShape { section: String, reason: String },
}
