mod api;
mod identity;
mod middleware;
mod scheduler;
mod trigger;

use std::sync::Arc;

use mintel_collectors::Enricher;
use mintel_worker::PgWorker;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    identity::IdentityVerifier,
    middleware::AuthState,
    trigger::WorkerTrigger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(mintel_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = mintel_db::PoolConfig::from_app_config(&config);
    let pool = mintel_db::connect_pool(&config.database_url, pool_config).await?;
    mintel_db::run_migrations(&pool).await?;

    let worker = match PgWorker::from_config(pool.clone(), &config) {
        Ok(worker) => Some(Arc::new(worker)),
        Err(e) if e.is_config() => {
            tracing::warn!(error = %e, "worker disabled; requests will stay pending");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let trigger = WorkerTrigger::from_settings(&config.worker, worker.clone())?;

    let _scheduler =
        scheduler::build_scheduler(pool.clone(), worker.clone(), Arc::clone(&config)).await?;

    let auth = AuthState::from_env(config.is_development())?;
    let state = AppState {
        pool,
        enricher: Arc::new(Enricher::from_config(&config)?),
        identity: IdentityVerifier::new(config.auth.clone()),
        trigger,
        worker,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, env = %config.env, "mintel-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
