//! Research lifecycle controller.
//!
//! One [`Worker::run_cycle`] takes the oldest pending request through
//! claim, enrichment refresh, the three analysis calls and result
//! persistence, and finishes it as `completed` or `failed`.

pub mod cycle;
pub mod error;

pub use cycle::{CycleOutcome, PgWorker, Worker, WorkerOptions};
pub use error::WorkerError;
