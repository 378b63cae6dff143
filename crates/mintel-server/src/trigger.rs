//! Fire-and-forget worker wake-up after intake.
//!
//! Delivery is best effort. A lost trigger only delays the job until the
//! cron poller's next cycle, because dequeueing is idempotent.

use std::sync::Arc;
use std::time::Duration;

use mintel_core::WorkerSettings;
use mintel_worker::PgWorker;
use reqwest::Client;

const REMOTE_TRIGGER_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub enum WorkerTrigger {
    /// Runs one cycle on this server's runtime.
    InProcess(Arc<PgWorker>),
    /// POSTs to a remote worker endpoint.
    Remote {
        client: Client,
        url: String,
        service_key: Option<String>,
    },
    /// No worker available; jobs wait for an external poller.
    Disabled,
}

impl WorkerTrigger {
    /// Remote when a trigger URL is configured, else in-process when a
    /// worker could be built.
    pub fn from_settings(
        settings: &WorkerSettings,
        worker: Option<Arc<PgWorker>>,
    ) -> anyhow::Result<Self> {
        if let Some(url) = settings.trigger_url.clone() {
            let client = Client::builder()
                .timeout(Duration::from_secs(REMOTE_TRIGGER_TIMEOUT_SECS))
                .build()?;
            return Ok(Self::Remote {
                client,
                url,
                service_key: settings.service_key.clone(),
            });
        }
        Ok(worker.map_or(Self::Disabled, Self::InProcess))
    }

    /// Wakes the worker without waiting for it. Failures are logged only.
    pub fn fire(&self) {
        match self {
            Self::InProcess(worker) => {
                let worker = Arc::clone(worker);
                tokio::spawn(async move {
                    match worker.run_cycle().await {
                        Ok(outcome) => {
                            tracing::info!(
                                outcome = %outcome,
                                "trigger: in-process cycle finished"
                            );
                        }
                        Err(e) => tracing::error!(error = %e, "trigger: in-process cycle failed"),
                    }
                });
            }
            Self::Remote {
                client,
                url,
                service_key,
            } => {
                let mut request = client.post(url.as_str());
                if let Some(key) = service_key {
                    request = request.bearer_auth(key);
                }
                let url = url.clone();
                tokio::spawn(async move {
                    match request.send().await {
                        Ok(resp) if resp.status().is_success() => {
                            tracing::debug!(url = %url, "trigger: remote worker accepted");
                        }
                        Ok(resp) => tracing::warn!(
                            url = %url,
                            status = %resp.status(),
                            "trigger: remote worker returned non-success"
                        ),
                        Err(e) => {
                            tracing::warn!(url = %url, error = %e, "trigger: remote call failed");
                        }
                    }
                });
            }
            Self::Disabled => {
                tracing::warn!("trigger: no worker configured; request left for the poller");
            }
        }
    }
}
