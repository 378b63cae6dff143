use mintel_core::CoreError;
use thiserror::Error;

/// Why a model completion could not be turned into JSON.
///
/// `Incomplete` means an opened container never closed, which a longer
/// response can fix. `Malformed` means the structure balanced but is still
/// not JSON, which it cannot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("response is incomplete: '{opener}' opened at offset {offset} was never closed")]
    Incomplete { opener: char, offset: usize },

    #[error("response is malformed: {reason}")]
    Malformed { reason: String },
}

impl DecodeError {
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, DecodeError::Incomplete { .. })
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing required credential: {0}")]
    MissingApiKey(&'static str),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion API response has no text content")]
    EmptyCompletion,

    #[error("failed to decode model response: {0}")]
    Decode(#[from] DecodeError),

    #[error("model response failed validation: {0}")]
    Report(#[from] CoreError),
}

impl LlmError {
    /// Only a truncated response justifies asking the model again.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, LlmError::Decode(e) if e.is_incomplete())
    }

    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            LlmError::MissingApiKey(_) | LlmError::InvalidBaseUrl { .. }
        )
    }
}
