//! In-memory [`ResearchStore`] for tests and local dry runs.
//!
//! Applies the same guards as the SQL statements: claims and terminal
//! writes only succeed from the expected status.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use mintel_core::{EnrichedCompetitor, Platform, RequestStatus, ResearchReport, TimeframeDays};
use uuid::Uuid;

use crate::{
    research_requests::stale_claim_message, DbError, ResearchRequestRow, ResearchResultRow,
    ResearchStore,
};

#[derive(Debug, Default)]
struct State {
    requests: Vec<ResearchRequestRow>,
    results: HashMap<Uuid, ResearchResultRow>,
    next_result_id: i64,
    fail_replace: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a `pending` request and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] if the snapshots cannot be encoded.
    pub fn insert_pending(
        &self,
        user_id: &str,
        platform: Platform,
        timeframe: TimeframeDays,
        competitors: &[EnrichedCompetitor],
    ) -> Result<Uuid, DbError> {
        let row = ResearchRequestRow {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            client_id: None,
            platform: platform.as_str().to_string(),
            timeframe_days: timeframe.days(),
            competitors: serde_json::to_value(competitors)?,
            status: RequestStatus::Pending.as_str().to_string(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let id = row.id;
        self.lock().requests.push(row);
        Ok(id)
    }

    /// Snapshot of one request.
    #[must_use]
    pub fn request(&self, id: Uuid) -> Option<ResearchRequestRow> {
        self.lock().requests.iter().find(|r| r.id == id).cloned()
    }

    /// Snapshot of one result.
    #[must_use]
    pub fn result(&self, request_id: Uuid) -> Option<ResearchResultRow> {
        self.lock().results.get(&request_id).cloned()
    }

    #[must_use]
    pub fn result_count(&self) -> usize {
        self.lock().results.len()
    }

    /// Makes every later result write fail, to exercise the failure path.
    pub fn set_replace_failure(&self, fail: bool) {
        self.lock().fail_replace = fail;
    }

    /// Rewinds a request's claim time, to exercise the stale sweep.
    pub fn backdate_claim(&self, id: Uuid, by: Duration) {
        let mut state = self.lock();
        if let Some(row) = state.requests.iter_mut().find(|r| r.id == id) {
            let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
            row.started_at = row.started_at.map(|t| t - by);
        }
    }
}

impl ResearchStore for MemoryStore {
    async fn next_pending(&self) -> Result<Option<ResearchRequestRow>, DbError> {
        Ok(self
            .lock()
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Pending.as_str())
            .min_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn try_claim(&self, id: Uuid, expected: RequestStatus) -> Result<bool, DbError> {
        expected.transition(RequestStatus::Processing)?;
        let mut state = self.lock();
        let Some(row) = state
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == expected.as_str())
        else {
            return Ok(false);
        };
        row.status = RequestStatus::Processing.as_str().to_string();
        row.started_at = Some(Utc::now());
        row.completed_at = None;
        row.error_message = None;
        Ok(true)
    }

    async fn complete_with_result(
        &self,
        request_id: Uuid,
        report: &ResearchReport,
    ) -> Result<(), DbError> {
        let mut row = ResearchResultRow::from_report(request_id, report)?;
        let mut state = self.lock();
        if state.fail_replace {
            return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
        }
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == request_id && r.status == RequestStatus::Processing.as_str())
            .ok_or(DbError::InvalidTransition {
                id: request_id,
                expected_status: "processing",
            })?;
        request.status = RequestStatus::Completed.as_str().to_string();
        request.completed_at = Some(Utc::now());
        request.error_message = None;

        state.next_result_id += 1;
        row.id = state.next_result_id;
        state.results.insert(request_id, row);
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> Result<(), DbError> {
        let mut state = self.lock();
        let row = state
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == RequestStatus::Processing.as_str())
            .ok_or(DbError::InvalidTransition {
                id,
                expected_status: "processing",
            })?;
        row.status = RequestStatus::Failed.as_str().to_string();
        row.completed_at = Some(Utc::now());
        row.error_message = Some(error_message.to_string());
        Ok(())
    }

    async fn sweep_stale(&self, stale_after: Duration) -> Result<Vec<Uuid>, DbError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
        let message = stale_claim_message(stale_after.as_secs());
        let mut swept = Vec::new();
        let mut state = self.lock();
        for row in &mut state.requests {
            let stale = row.status == RequestStatus::Processing.as_str()
                && row.started_at.is_some_and(|t| t < cutoff);
            if stale {
                row.status = RequestStatus::Failed.as_str().to_string();
                row.completed_at = Some(Utc::now());
                row.error_message = Some(message.clone());
                swept.push(row.id);
            }
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_one() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let snap = EnrichedCompetitor::empty(Platform::Youtube, "https://youtube.com/@a");
        let id = store
            .insert_pending("user-1", Platform::Youtube, TimeframeDays::Thirty, &[snap])
            .expect("insert");
        (store, id)
    }

    #[tokio::test]
    async fn second_claim_loses() {
        let (store, id) = store_with_one();
        assert!(store.try_claim(id, RequestStatus::Pending).await.unwrap());
        assert!(!store.try_claim(id, RequestStatus::Pending).await.unwrap());
        assert_eq!(store.request(id).unwrap().status, "processing");
    }

    #[tokio::test]
    async fn claim_from_terminal_status_is_rejected() {
        let (store, id) = store_with_one();
        let err = store.try_claim(id, RequestStatus::Completed).await.unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }

    #[tokio::test]
    async fn completion_requires_processing() {
        let (store, id) = store_with_one();
        let err = store
            .complete_with_result(id, &ResearchReport::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition { .. }));
        assert_eq!(store.result_count(), 0);
    }

    #[tokio::test]
    async fn completion_stores_result_and_status_together() {
        let (store, id) = store_with_one();
        store.try_claim(id, RequestStatus::Pending).await.unwrap();
        let mut report = ResearchReport::default();
        report.overview.executive_summary = "uno".to_string();
        store.complete_with_result(id, &report).await.unwrap();

        assert_eq!(store.request(id).unwrap().status, "completed");
        assert_eq!(store.result_count(), 1);
        assert_eq!(store.result(id).unwrap().resumen_ejecutivo, "uno");
    }

    #[tokio::test]
    async fn swept_request_never_gets_a_result() {
        let (store, id) = store_with_one();
        store.try_claim(id, RequestStatus::Pending).await.unwrap();
        store.backdate_claim(id, Duration::from_secs(60));
        store.sweep_stale(Duration::from_secs(1)).await.unwrap();

        let err = store
            .complete_with_result(id, &ResearchReport::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition { .. }));
        assert_eq!(store.request(id).unwrap().status, "failed");
        assert_eq!(store.result_count(), 0);
    }

    #[tokio::test]
    async fn sweep_fails_only_old_claims() {
        let (store, old) = store_with_one();
        let fresh = store
            .insert_pending(
                "user-2",
                Platform::Youtube,
                TimeframeDays::Sixty,
                &[EnrichedCompetitor::empty(
                    Platform::Youtube,
                    "https://youtube.com/@b",
                )],
            )
            .unwrap();
        store.try_claim(old, RequestStatus::Pending).await.unwrap();
        store.try_claim(fresh, RequestStatus::Pending).await.unwrap();
        store.backdate_claim(old, Duration::from_secs(3600));

        let swept = store.sweep_stale(Duration::from_secs(1800)).await.unwrap();
        assert_eq!(swept, vec![old]);
        let row = store.request(old).unwrap();
        assert_eq!(row.status, "failed");
        assert!(row
            .error_message
            .unwrap()
            .starts_with("processing claim expired"));
        assert_eq!(store.request(fresh).unwrap().status, "processing");
    }
}
