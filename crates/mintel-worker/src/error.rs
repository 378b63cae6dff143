use mintel_collectors::CollectorError;
use mintel_core::CoreError;
use mintel_db::DbError;
use mintel_llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("enrichment error: {0}")]
    Collector(#[from] CollectorError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("job exceeded the {secs}s processing timeout")]
    Timeout { secs: u64 },
}

impl WorkerError {
    /// Missing credentials or invalid endpoints: retrying will not help.
    #[must_use]
    pub fn is_config(&self) -> bool {
        match self {
            WorkerError::Collector(e) => e.is_config(),
            WorkerError::Llm(e) => e.is_config(),
            _ => false,
        }
    }
}
