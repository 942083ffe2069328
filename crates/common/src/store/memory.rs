//! In-process analysis store
//!
//! Holds at most `max_records` analyses. When full, the finished analysis
//! that changed least recently is evicted to make room; in-flight analyses
//! are never evicted.

use super::AnalysisStore;
use crate::errors::{AppError, Result};
use crate::models::{AnalysisRecord, AnalysisResult, AnalysisStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Capacity used by [`InMemoryAnalysisStore::new`]
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Analysis store backed by a bounded map behind an async RwLock
pub struct InMemoryAnalysisStore {
    records: RwLock<HashMap<Uuid, AnalysisRecord>>,
    max_records: usize,
}

impl Default for InMemoryAnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_RECORDS)
    }

    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_records: max_records.max(1),
        }
    }

    /// Drop the stalest finished analysis, if there is one
    fn evict_one(records: &mut HashMap<Uuid, AnalysisRecord>) -> Option<Uuid> {
        let stalest = records
            .values()
            .filter(|record| record.status.is_terminal())
            .min_by_key(|record| record.updated_at)
            .map(|record| record.id)?;

        records.remove(&stalest);
        Some(stalest)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn modify<F>(&self, id: Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut AnalysisRecord) -> Result<()> + Send,
    {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| AppError::AnalysisNotFound {
            id: id.to_string(),
        })?;

        if record.status.is_terminal() {
            return Err(AppError::Storage {
                message: format!("analysis {id} already {}", record.status),
            });
        }

        apply(record)?;
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn insert(&self, record: AnalysisRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(AppError::Storage {
                message: format!("analysis {} already exists", record.id),
            });
        }

        if records.len() >= self.max_records {
            match Self::evict_one(&mut records) {
                Some(evicted) => debug!(analysis_id = %evicted, "Evicted finished analysis"),
                None => {
                    return Err(AppError::ServiceUnavailable {
                        message: format!("{} analyses already in flight", records.len()),
                    })
                }
            }
        }

        debug!(analysis_id = %record.id, "Analysis stored");
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: AnalysisStatus) -> Result<()> {
        if status.is_terminal() {
            return Err(AppError::Internal {
                message: format!("status {status} must be set through complete or fail"),
            });
        }
        self.modify(id, |record| {
            record.status = status;
            Ok(())
        })
        .await
    }

    async fn complete(&self, id: Uuid, result: AnalysisResult) -> Result<()> {
        self.modify(id, move |record| {
            record.status = AnalysisStatus::Completed;
            record.result = Some(result);
            record.error_message = None;
            Ok(())
        })
        .await
    }

    async fn fail(&self, id: Uuid, message: String) -> Result<()> {
        self.modify(id, move |record| {
            record.status = AnalysisStatus::Failed;
            record.error_message = Some(message);
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OverallAssessment, ResearchProfile, SearchRequest};
    use tokio_test::{assert_err, assert_ok};

    fn record() -> AnalysisRecord {
        AnalysisRecord::new(
            ResearchProfile {
                title: "Solid-state electrolyte".into(),
                description: "A sulfide electrolyte with improved stability against lithium metal".into(),
                researcher_name: None,
            },
            SearchRequest::new(["solid electrolyte"]),
        )
    }

    fn result() -> AnalysisResult {
        AnalysisResult {
            request: SearchRequest::new(["solid electrolyte"]),
            keywords: vec!["solid electrolyte".into()],
            assessment: OverallAssessment::no_patents(),
            recommendations: Vec::new(),
            skipped_records: 0,
            total_matched: 0,
            provider_error: None,
            assessed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let store = InMemoryAnalysisStore::new();
        let record = record();
        let id = record.id;

        assert_ok!(store.insert(record).await);
        assert_ok!(store.update_status(id, AnalysisStatus::Analyzing).await);
        assert_ok!(store.complete(id, result()).await);

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalysisStatus::Completed);
        assert!(stored.result.is_some());
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_terminal_records_are_frozen() {
        let store = InMemoryAnalysisStore::new();
        let record = record();
        let id = record.id;
        store.insert(record).await.unwrap();
        store.fail(id, "provider down".into()).await.unwrap();

        assert_err!(store.complete(id, result()).await);
        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalysisStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("provider down"));
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = InMemoryAnalysisStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
        let err = store
            .update_status(Uuid::new_v4(), AnalysisStatus::Analyzing)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AnalysisNotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryAnalysisStore::new();
        let record = record();
        store.insert(record.clone()).await.unwrap();
        assert!(store.insert(record).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_full_store_evicts_stalest_finished_analysis() {
        let store = InMemoryAnalysisStore::with_capacity(3);
        let first = record();
        let second = record();
        let running = record();
        let (first_id, second_id, running_id) = (first.id, second.id, running.id);

        for r in [first, second, running] {
            store.insert(r).await.unwrap();
        }
        store.complete(first_id, result()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.fail(second_id, "provider down".into()).await.unwrap();
        store.update_status(running_id, AnalysisStatus::Analyzing).await.unwrap();

        let next = record();
        let next_id = next.id;
        assert_ok!(store.insert(next).await);

        assert_eq!(store.len().await, 3);
        assert!(store.get(first_id).await.unwrap().is_none());
        assert!(store.get(second_id).await.unwrap().is_some());
        assert!(store.get(running_id).await.unwrap().is_some());
        assert!(store.get(next_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_store_of_in_flight_analyses_rejects_inserts() {
        let store = InMemoryAnalysisStore::with_capacity(1);
        store.insert(record()).await.unwrap();

        let err = store.insert(record()).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable { .. }));
        assert_eq!(store.len().await, 1);
    }
}
