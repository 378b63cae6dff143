//! Research request intake and the polling endpoints the dashboard reads.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mintel_db::{DbError, NewResearchRequest, ResearchRequestRow, ResearchResultRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::identity::IdentityError;
use crate::middleware::{bearer_token, RequestId};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

/// Intake body. Fields stay untyped so validation can name the bad one.
#[derive(Debug, Default, Deserialize)]
pub(super) struct CreateResearchRequest {
    pub platform: Option<Value>,
    pub timeframe_days: Option<Value>,
    pub competitors: Option<Value>,
    pub access_token: Option<Value>,
    pub client_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateResearchResponse {
    pub request_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ResearchRequestItem {
    request_id: Uuid,
    client_id: Option<String>,
    platform: String,
    timeframe_days: i32,
    competitors: Value,
    status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ResearchRequestRow> for ResearchRequestItem {
    fn from(row: ResearchRequestRow) -> Self {
        Self {
            request_id: row.id,
            client_id: row.client_id,
            platform: row.platform,
            timeframe_days: row.timeframe_days,
            competitors: row.competitors,
            status: row.status,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

fn identity_error(rid: &str, error: &IdentityError) -> ApiError {
    match error {
        IdentityError::Unconfigured => {
            tracing::error!("intake: no JWT secret and upstream trust disabled");
            ApiError::new(rid, "configuration_error", error.to_string())
        }
        _ => ApiError::new(rid, "unauthorized", error.to_string()),
    }
}

/// Resolves the caller from `token`, falling back to the bearer header.
fn caller(
    state: &AppState,
    rid: &str,
    headers: &HeaderMap,
    token: Option<&str>,
) -> Result<String, ApiError> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| identity_error(rid, &IdentityError::Missing))?;
    state
        .identity
        .subject(token)
        .map_err(|e| identity_error(rid, &e))
}

fn parse_request_id(rid: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::new(
            rid,
            "validation_error",
            format!("request id must be a UUID, got '{raw}'"),
        )
    })
}

fn not_found(rid: &str) -> ApiError {
    ApiError::new(rid, "not_found", "research request not found")
}

/// Loads a request the caller owns. Someone else's request is reported as
/// missing.
async fn owned_request(
    state: &AppState,
    rid: &str,
    user_id: &str,
    id: Uuid,
) -> Result<ResearchRequestRow, ApiError> {
    match mintel_db::get_research_request(&state.pool, id).await {
        Ok(row) if row.user_id == user_id => Ok(row),
        Ok(_) | Err(DbError::NotFound) => Err(not_found(rid)),
        Err(e) => Err(map_db_error(rid.to_owned(), &e)),
    }
}

/// POST /api/v1/research-requests: validate, enrich, queue and wake the worker.
pub(super) async fn create_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CreateResearchRequest>,
) -> Result<Json<ApiResponse<CreateResearchResponse>>, ApiError> {
    let rid = &req_id.0;

    let token = body.access_token.as_ref().and_then(Value::as_str);
    let user_id = caller(&state, rid, &headers, token)?;

    let validated = mintel_core::validate_request(
        body.platform.as_ref(),
        body.timeframe_days.as_ref(),
        body.competitors.as_ref(),
        body.client_id.as_ref(),
    )
    .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let snapshots = state
        .enricher
        .enrich_all(validated.platform, &validated.competitors)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "intake: enrichment misconfigured");
            ApiError::new(rid, "configuration_error", e.to_string())
        })?;

    let row = mintel_db::insert_research_request(
        &state.pool,
        &NewResearchRequest {
            user_id: &user_id,
            client_id: validated.client_id.as_deref(),
            platform: validated.platform,
            timeframe: validated.timeframe,
            competitors: &snapshots,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        request_id = %row.id,
        platform = %validated.platform,
        competitors = snapshots.len(),
        "intake: research request queued"
    );
    state.trigger.fire();

    Ok(Json(ApiResponse {
        data: CreateResearchResponse { request_id: row.id },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/research-requests: the caller's requests, newest first.
pub(super) async fn list_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ResearchRequestItem>>>, ApiError> {
    let user_id = caller(&state, &req_id.0, &headers, None)?;
    let rows =
        mintel_db::list_requests_for_user(&state.pool, &user_id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ResearchRequestItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/research-requests/latest
pub(super) async fn latest_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ResearchRequestItem>>, ApiError> {
    let user_id = caller(&state, &req_id.0, &headers, None)?;
    let row = mintel_db::latest_request_for_user(&state.pool, &user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| not_found(&req_id.0))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/research-requests/{id}
pub(super) async fn get_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResearchRequestItem>>, ApiError> {
    let rid = &req_id.0;
    let user_id = caller(&state, rid, &headers, None)?;
    let id = parse_request_id(rid, &id)?;
    let row = owned_request(&state, rid, &user_id, id).await?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/research-requests/{id}/result: 404 until the worker has
/// stored a result.
pub(super) async fn get_result(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResearchResultRow>>, ApiError> {
    let rid = &req_id.0;
    let user_id = caller(&state, rid, &headers, None)?;
    let id = parse_request_id(rid, &id)?;
    owned_request(&state, rid, &user_id, id).await?;

    let result = mintel_db::get_research_result(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "result not available yet"))?;

    Ok(Json(ApiResponse {
        data: result,
        meta: ResponseMeta::new(req_id.0),
    }))
}
