//! Manual worker invocations, for operators and cron outside the server.

use std::time::Duration;

use clap::Subcommand;
use mintel_core::AppConfig;
use mintel_worker::{CycleOutcome, PgWorker};
use sqlx::PgPool;

#[derive(Debug, Subcommand)]
pub enum WorkerCommands {
    /// Process at most one pending request
    RunOnce,
    /// Fail processing requests whose claim is older than the threshold
    SweepStale {
        /// Override MINTEL_CLAIM_STALE_AFTER_SECS
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
}

pub(crate) async fn run(
    command: WorkerCommands,
    pool: PgPool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    match command {
        WorkerCommands::RunOnce => {
            let worker = PgWorker::from_config(pool, config)?;
            let outcome = worker.run_cycle().await?;
            match &outcome {
                CycleOutcome::Completed { request_id } => println!("OK: {request_id}"),
                CycleOutcome::Failed { request_id, error } => {
                    anyhow::bail!("request {request_id} failed: {error}");
                }
                CycleOutcome::NoPending | CycleOutcome::NothingToClaim => println!("{outcome}"),
            }
        }
        WorkerCommands::SweepStale { older_than_secs } => {
            let secs = older_than_secs.unwrap_or(config.worker.claim_stale_after_secs);
            let swept = mintel_db::sweep_stale_claims(&pool, Duration::from_secs(secs)).await?;
            if swept.is_empty() {
                println!("no stale claims older than {secs}s");
            }
            for id in &swept {
                println!("failed stale claim {id}");
            }
        }
    }
    Ok(())
}
