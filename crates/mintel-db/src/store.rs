//! Storage seam used by the worker.
//!
//! The lifecycle controller only needs dequeue, compare-and-swap claim,
//! the atomic result-plus-completion write and the failure writes. `PgPool` implements it
//! for production; [`crate::MemoryStore`] implements it for tests.

use std::future::Future;
use std::time::Duration;

use mintel_core::{RequestStatus, ResearchReport};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{research_requests, research_results, DbError, ResearchRequestRow};

pub trait ResearchStore: Send + Sync {
    /// Oldest pending request, without claiming it.
    fn next_pending(
        &self,
    ) -> impl Future<Output = Result<Option<ResearchRequestRow>, DbError>> + Send;

    /// Moves `id` to `processing` only if it is still in `expected`.
    /// `Ok(false)` means another invocation won the claim.
    fn try_claim(
        &self,
        id: Uuid,
        expected: RequestStatus,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Replaces the single result row for `request_id` and marks it
    /// `completed`, atomically. Fails with [`DbError::InvalidTransition`]
    /// unless the request is still `processing`.
    fn complete_with_result(
        &self,
        request_id: Uuid,
        report: &ResearchReport,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn fail(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Fails `processing` requests claimed longer than `stale_after` ago.
    fn sweep_stale(
        &self,
        stale_after: Duration,
    ) -> impl Future<Output = Result<Vec<Uuid>, DbError>> + Send;
}

impl ResearchStore for PgPool {
    async fn next_pending(&self) -> Result<Option<ResearchRequestRow>, DbError> {
        research_requests::next_pending_request(self).await
    }

    async fn try_claim(&self, id: Uuid, expected: RequestStatus) -> Result<bool, DbError> {
        research_requests::try_claim_research_request(self, id, expected).await
    }

    async fn complete_with_result(
        &self,
        request_id: Uuid,
        report: &ResearchReport,
    ) -> Result<(), DbError> {
        research_results::complete_with_result(self, request_id, report).await?;
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> Result<(), DbError> {
        research_requests::fail_research_request(self, id, error_message).await
    }

    async fn sweep_stale(&self, stale_after: Duration) -> Result<Vec<Uuid>, DbError> {
        research_requests::sweep_stale_claims(self, stale_after).await
    }
}
