use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    /// A credential the collector cannot run without is not configured.
    #[error("missing required credential: {0}")]
    MissingApiKey(&'static str),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Transport failure. The request URL is stripped on conversion because
    /// it can carry an API key.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("rate limited by {host} (retry after {retry_after_secs}s)")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl From<reqwest::Error> for CollectorError {
    fn from(e: reqwest::Error) -> Self {
        CollectorError::Http(e.without_url())
    }
}

impl CollectorError {
    /// Configuration errors fail the caller; everything else degrades to an
    /// empty snapshot.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            CollectorError::MissingApiKey(_) | CollectorError::InvalidBaseUrl { .. }
        )
    }
}
