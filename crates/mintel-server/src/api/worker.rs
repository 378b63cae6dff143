use axum::{extract::State, Extension, Json};
use mintel_worker::CycleOutcome;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct WorkerRunData {
    status: String,
    request_id: Option<Uuid>,
}

/// POST /api/v1/worker/run: one dequeue, claim and process cycle.
///
/// A job that ends in `failed` is reported as 500 with its error message.
pub(super) async fn run_worker(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<WorkerRunData>>, ApiError> {
    let rid = &req_id.0;
    let worker = state.worker.as_ref().ok_or_else(|| {
        ApiError::new(
            rid,
            "configuration_error",
            "worker is not configured: ANTHROPIC_API_KEY is missing",
        )
    })?;

    let outcome = worker.run_cycle().await.map_err(|e| {
        tracing::error!(error = %e, "worker: cycle aborted before claim");
        ApiError::new(rid, "worker_error", e.to_string())
    })?;

    let request_id = match &outcome {
        CycleOutcome::Failed { error, .. } => {
            return Err(ApiError::new(rid, "worker_error", error.clone()));
        }
        CycleOutcome::Completed { request_id } => Some(*request_id),
        CycleOutcome::NoPending | CycleOutcome::NothingToClaim => None,
    };

    Ok(Json(ApiResponse {
        data: WorkerRunData {
            status: outcome.message().to_owned(),
            request_id,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
