//! Background job scheduler.
//!
//! Registers the periodic worker poll, which picks up any request whose
//! trigger was lost, and the stale-claim sweep.

use std::sync::Arc;
use std::time::Duration;

use mintel_core::AppConfig;
use mintel_worker::PgWorker;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every five minutes, at second 30 so it never coincides with the poll.
const SWEEP_CRON: &str = "30 */5 * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    worker: Option<Arc<PgWorker>>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match worker {
        Some(worker) => register_poll_job(&scheduler, worker, &config.worker.poll_cron).await?,
        None => tracing::warn!("scheduler: worker unavailable, poll job not registered"),
    }
    register_sweep_job(
        &scheduler,
        pool,
        Duration::from_secs(config.worker.claim_stale_after_secs),
    )
    .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Runs one worker cycle per tick.
async fn register_poll_job(
    scheduler: &JobScheduler,
    worker: Arc<PgWorker>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let worker = Arc::clone(&worker);

        Box::pin(async move {
            match worker.run_cycle().await {
                Ok(outcome) => {
                    tracing::debug!(outcome = %outcome, "scheduler: worker poll complete");
                }
                Err(e) => tracing::error!(error = %e, "scheduler: worker poll failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: worker poll registered");
    Ok(())
}

/// Fails `processing` requests whose claim outlived `stale_after`.
async fn register_sweep_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    stale_after: Duration,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(SWEEP_CRON, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            match mintel_db::sweep_stale_claims(&pool, stale_after).await {
                Ok(ids) if ids.is_empty() => {}
                Ok(ids) => tracing::warn!(
                    count = ids.len(),
                    ids = ?ids,
                    "scheduler: failed stale processing claims"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: stale-claim sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
