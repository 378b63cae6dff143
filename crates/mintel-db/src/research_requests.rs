//! Database operations for `research_requests`.
//!
//! Every status write is guarded by `WHERE status = <expected>` so the
//! table itself enforces the lifecycle, including claim exclusivity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mintel_core::{EnrichedCompetitor, Platform, RequestStatus, TimeframeDays};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `research_requests` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResearchRequestRow {
    pub id: Uuid,
    pub user_id: String,
    pub client_id: Option<String>,
    pub platform: String,
    pub timeframe_days: i32,
    /// JSON array of [`EnrichedCompetitor`] snapshots taken at intake.
    pub competitors: serde_json::Value,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResearchRequestRow {
    /// # Errors
    ///
    /// Returns [`DbError::Core`] when the stored status is unknown.
    pub fn status(&self) -> Result<RequestStatus, DbError> {
        Ok(self.status.parse()?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Core`] when the stored platform is unknown.
    pub fn platform(&self) -> Result<Platform, DbError> {
        Ok(self.platform.parse()?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Core`] when the stored window is not 30, 60 or 90.
    pub fn timeframe(&self) -> Result<TimeframeDays, DbError> {
        Ok(TimeframeDays::try_from(i64::from(self.timeframe_days))?)
    }

    /// Decodes the stored competitor snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] when the column does not hold an array of
    /// snapshot objects.
    pub fn competitors(&self) -> Result<Vec<EnrichedCompetitor>, DbError> {
        serde_json::from_value(self.competitors.clone()).map_err(|e| DbError::Corrupt {
            id: self.id,
            reason: format!("competitors: {e}"),
        })
    }
}

/// Input for [`insert_research_request`].
#[derive(Debug, Clone)]
pub struct NewResearchRequest<'a> {
    pub user_id: &'a str,
    pub client_id: Option<&'a str>,
    pub platform: Platform,
    pub timeframe: TimeframeDays,
    pub competitors: &'a [EnrichedCompetitor],
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a new request in `pending` status and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Json`] if the snapshots cannot be encoded, or
/// [`DbError::Sqlx`] if the insert fails (including the competitor-count
/// check constraint).
pub async fn insert_research_request(
    pool: &PgPool,
    new: &NewResearchRequest<'_>,
) -> Result<ResearchRequestRow, DbError> {
    let id = Uuid::new_v4();
    let competitors = serde_json::to_value(new.competitors)?;

    let row = sqlx::query_as::<_, ResearchRequestRow>(
        "INSERT INTO research_requests \
             (id, user_id, client_id, platform, timeframe_days, competitors, status) \
         VALUES ($1, $2, $3, $4, $5, $6, 'pending') \
         RETURNING id, user_id, client_id, platform, timeframe_days, competitors, status, \
                   error_message, created_at, started_at, completed_at",
    )
    .bind(id)
    .bind(new.user_id)
    .bind(new.client_id)
    .bind(new.platform.as_str())
    .bind(new.timeframe.days())
    .bind(competitors)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the oldest `pending` request, or `None` when the queue is empty.
///
/// This does not claim the row; callers must follow up with
/// [`try_claim_research_request`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn next_pending_request(pool: &PgPool) -> Result<Option<ResearchRequestRow>, DbError> {
    let row = sqlx::query_as::<_, ResearchRequestRow>(
        "SELECT id, user_id, client_id, platform, timeframe_days, competitors, status, \
                error_message, created_at, started_at, completed_at \
         FROM research_requests \
         WHERE status = 'pending' \
         ORDER BY created_at ASC, id ASC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Compare-and-swap claim: moves the request to `processing` only if it is
/// still in `expected`.
///
/// Returns `true` when this call won the claim and `false` when the row was
/// already claimed (or no longer exists).
///
/// # Errors
///
/// Returns [`DbError::Core`] if `expected` cannot transition to
/// `processing`, or [`DbError::Sqlx`] if the update fails.
pub async fn try_claim_research_request(
    pool: &PgPool,
    id: Uuid,
    expected: RequestStatus,
) -> Result<bool, DbError> {
    expected.transition(RequestStatus::Processing)?;

    let result = sqlx::query(
        "UPDATE research_requests \
         SET status = 'processing', started_at = NOW(), completed_at = NULL, error_message = NULL \
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Marks a claimed request `completed` and clears any previous error.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the request is not `processing`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_research_request<'e, E>(executor: E, id: Uuid) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE research_requests \
         SET status = 'completed', completed_at = NOW(), error_message = NULL \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// Marks a claimed request `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the request is not `processing`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_research_request(
    pool: &PgPool,
    id: Uuid,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE research_requests \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'processing'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// Fails every `processing` request whose claim is older than `stale_after`.
///
/// Returns the ids that were swept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn sweep_stale_claims(
    pool: &PgPool,
    stale_after: Duration,
) -> Result<Vec<Uuid>, DbError> {
    let secs = stale_after.as_secs();
    let message = stale_claim_message(secs);

    let ids = sqlx::query_scalar::<_, Uuid>(
        "UPDATE research_requests \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE status = 'processing' \
           AND started_at < NOW() - make_interval(secs => $2) \
         RETURNING id",
    )
    .bind(&message)
    .bind(stale_after.as_secs_f64())
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// `error_message` written by the stale-claim sweep.
#[must_use]
pub fn stale_claim_message(stale_after_secs: u64) -> String {
    format!("processing claim expired after {stale_after_secs}s without completion")
}

/// Fetches a single request by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_research_request(pool: &PgPool, id: Uuid) -> Result<ResearchRequestRow, DbError> {
    let row = sqlx::query_as::<_, ResearchRequestRow>(
        "SELECT id, user_id, client_id, platform, timeframe_days, competitors, status, \
                error_message, created_at, started_at, completed_at \
         FROM research_requests \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the caller's requests, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_requests_for_user(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ResearchRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, ResearchRequestRow>(
        "SELECT id, user_id, client_id, platform, timeframe_days, competitors, status, \
                error_message, created_at, started_at, completed_at \
         FROM research_requests \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the caller's most recent request, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_request_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<ResearchRequestRow>, DbError> {
    Ok(list_requests_for_user(pool, user_id, 1).await?.into_iter().next())
}

/// Operator listing across all users, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_research_requests(
    pool: &PgPool,
    status: Option<RequestStatus>,
    limit: i64,
) -> Result<Vec<ResearchRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, ResearchRequestRow>(
        "SELECT id, user_id, client_id, platform, timeframe_days, competitors, status, \
                error_message, created_at, started_at, completed_at \
         FROM research_requests \
         WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(status.map(RequestStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
