//! One worker invocation: dequeue, claim, execute, persist, finalize.
//!
//! The claim is the only concurrency control. Whoever loses it returns
//! [`CycleOutcome::NothingToClaim`] without touching the request.

use std::fmt;
use std::time::Duration;

use mintel_collectors::Enricher;
use mintel_core::{
    top_items_by_views, AppConfig, RequestStatus, ResearchReport, WorkerSettings,
    MAX_VIDEO_ANALYSES,
};
use mintel_db::{ResearchRequestRow, ResearchStore};
use mintel_llm::{AnthropicClient, Analyst, CompletionClient, ResearchContext};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::WorkerError;

/// Result of one [`Worker::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoPending,
    NothingToClaim,
    Completed { request_id: Uuid },
    Failed { request_id: Uuid, error: String },
}

impl CycleOutcome {
    /// Status line returned by the trigger endpoint.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            CycleOutcome::NoPending => "No pending requests",
            CycleOutcome::NothingToClaim => "Nothing to claim",
            CycleOutcome::Completed { .. } => "OK",
            CycleOutcome::Failed { error, .. } => error,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Failed { .. })
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Hard limit for execute + persist of one job. Configuration keeps it
    /// below the stale-claim threshold.
    pub job_timeout: Duration,
}

impl WorkerOptions {
    #[must_use]
    pub fn from_settings(settings: &WorkerSettings) -> Self {
        Self {
            job_timeout: Duration::from_secs(settings.job_timeout_secs),
        }
    }
}

pub struct Worker<S, C> {
    store: S,
    enricher: Enricher,
    analyst: Analyst<C>,
    options: WorkerOptions,
}

/// The production worker: Postgres store and Anthropic completions.
pub type PgWorker = Worker<PgPool, AnthropicClient>;

impl PgWorker {
    /// # Errors
    ///
    /// Returns a configuration error when the completion key is missing or an
    /// HTTP client cannot be built.
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Result<Self, WorkerError> {
        let client = AnthropicClient::from_settings(&config.llm)?;
        Ok(Worker::new(
            pool,
            Enricher::from_config(config)?,
            Analyst::new(client, &config.llm),
            WorkerOptions::from_settings(&config.worker),
        ))
    }
}

impl<S: ResearchStore, C: CompletionClient> Worker<S, C> {
    #[must_use]
    pub fn new(store: S, enricher: Enricher, analyst: Analyst<C>, options: WorkerOptions) -> Self {
        Self {
            store,
            enricher,
            analyst,
            options,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Processes at most one pending request end to end.
    ///
    /// A failing job is reported as [`CycleOutcome::Failed`] after its row
    /// has been moved to `failed`; only errors before the claim are returned
    /// as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Db`] if dequeueing or claiming fails.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, WorkerError> {
        let Some(row) = self.store.next_pending().await? else {
            tracing::debug!("worker: no pending requests");
            return Ok(CycleOutcome::NoPending);
        };
        let request_id = row.id;

        if !self.store.try_claim(request_id, RequestStatus::Pending).await? {
            tracing::info!(request_id = %request_id, "worker: request already claimed elsewhere");
            return Ok(CycleOutcome::NothingToClaim);
        }
        tracing::info!(
            request_id = %request_id,
            platform = %row.platform,
            "worker: claimed request"
        );

        let timeout = self.options.job_timeout;
        let result = match tokio::time::timeout(timeout, self.process(&row)).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout {
                secs: timeout.as_secs(),
            }),
        };

        match result {
            Ok(()) => {
                tracing::info!(request_id = %request_id, "worker: request completed");
                Ok(CycleOutcome::Completed { request_id })
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(request_id = %request_id, error = %error, "worker: request failed");
                if let Err(fail_err) = self.store.fail(request_id, &error).await {
                    tracing::error!(
                        request_id = %request_id,
                        error = %fail_err,
                        "worker: could not record failure"
                    );
                }
                Ok(CycleOutcome::Failed { request_id, error })
            }
        }
    }

    async fn process(&self, row: &ResearchRequestRow) -> Result<(), WorkerError> {
        let report = self.execute(row).await?;
        self.store.complete_with_result(row.id, &report).await?;
        Ok(())
    }

    /// Enrichment and the three analysis calls for one claimed request.
    async fn execute(&self, row: &ResearchRequestRow) -> Result<ResearchReport, WorkerError> {
        let platform = row.platform()?;
        let timeframe = row.timeframe()?;
        let stored = row.competitors()?;

        let mut competitors = self.enricher.refresh_empty(platform, stored).await?;
        let transcripts = self.enricher.attach_transcripts(&mut competitors).await;
        tracing::info!(
            request_id = %row.id,
            competitors = competitors.len(),
            transcripts,
            "worker: enrichment ready"
        );

        let ctx = ResearchContext {
            platform,
            timeframe,
            competitors: &competitors,
        };
        let overview = self.analyst.market_overview(&ctx).await?;
        let strategy = self.analyst.strategy(&ctx).await?;
        let top = top_items_by_views(&competitors, MAX_VIDEO_ANALYSES);
        let videos = self.analyst.video_analyses(platform, &top).await?;

        Ok(ResearchReport {
            overview,
            strategy,
            videos,
        })
    }
}

#[cfg(test)]
#[path = "cycle_test.rs"]
mod tests;
