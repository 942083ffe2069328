//! Background analysis workers
//!
//! Submitted analyses go through a bounded queue to a fixed set of worker
//! tasks. Each job:
//! 1. moves the stored analysis to `analyzing`
//! 2. queries the patent provider
//! 3. runs the risk engine on the outcome
//! 4. stores the result (`completed`) or the failure reason (`failed`)
//! 5. reports the terminal status on the job's completion channel

use fto_common::config::WorkerConfig;
use fto_common::errors::{AppError, Result};
use fto_common::metrics::record_queue_depth;
use fto_common::models::AnalysisStatus;
use fto_common::AnalysisStore;
use fto_risk::{PreparedSearch, RiskEngine};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::provider::{self, PatentProvider};

/// One queued analysis
struct AnalysisJob {
    analysis_id: Uuid,
    prepared: PreparedSearch,
    done: oneshot::Sender<AnalysisStatus>,
}

/// Collaborators shared by every worker
#[derive(Clone)]
struct WorkerContext {
    engine: Arc<RiskEngine>,
    store: Arc<dyn AnalysisStore>,
    provider: Arc<dyn PatentProvider>,
}

/// Handle for submitting jobs to the pool
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<AnalysisJob>,
    capacity: usize,
}

impl WorkerPool {
    /// Spawn `config.concurrency` workers behind a queue of
    /// `config.queue_capacity` jobs.
    pub fn spawn(
        config: &WorkerConfig,
        engine: Arc<RiskEngine>,
        store: Arc<dyn AnalysisStore>,
        provider: Arc<dyn PatentProvider>,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let context = WorkerContext { engine, store, provider };

        let handles = (0..config.concurrency.max(1))
            .map(|worker_id| {
                let receiver = receiver.clone();
                let context = context.clone();
                tokio::spawn(run_worker(worker_id, receiver, context))
            })
            .collect();

        info!(workers = config.concurrency, capacity, "Analysis worker pool started");

        (Self { sender, capacity }, handles)
    }

    /// Queue an analysis. Returns a receiver that resolves to the terminal
    /// status once a worker has finished the job.
    pub fn submit(
        &self,
        analysis_id: Uuid,
        prepared: PreparedSearch,
    ) -> Result<oneshot::Receiver<AnalysisStatus>> {
        let (done, completion) = oneshot::channel();
        let job = AnalysisJob { analysis_id, prepared, done };

        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::QueueError {
                message: "analysis queue is full".to_string(),
            },
            mpsc::error::TrySendError::Closed(_) => AppError::ServiceUnavailable {
                message: "analysis workers have stopped".to_string(),
            },
        })?;

        record_queue_depth(self.queue_depth());
        Ok(completion)
    }

    /// Jobs waiting for a worker
    pub fn queue_depth(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<AnalysisJob>>>,
    context: WorkerContext,
) {
    loop {
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        let span = tracing::info_span!("analysis", analysis_id = %job.analysis_id, worker_id);
        let status = process(&context, job.analysis_id, job.prepared)
            .instrument(span)
            .await;

        // The submitter may have stopped waiting
        let _ = job.done.send(status);
    }

    info!(worker_id, "Analysis worker stopped");
}

async fn process(context: &WorkerContext, analysis_id: Uuid, prepared: PreparedSearch) -> AnalysisStatus {
    if let Err(e) = context
        .store
        .update_status(analysis_id, AnalysisStatus::Analyzing)
        .await
    {
        warn!(error = %e, "Could not mark analysis as analyzing");
    }

    // A panic in the engine must not take the worker down with it
    let task_context = context.clone();
    let analysis = tokio::spawn(async move {
        let outcome = provider::fetch(task_context.provider.as_ref(), &prepared.query).await;
        task_context.engine.analyze(&prepared, outcome).await
    })
    .await;

    let stored = match analysis {
        Ok(result) => context
            .store
            .complete(analysis_id, result)
            .await
            .map(|_| AnalysisStatus::Completed),
        Err(e) => {
            error!(error = %e, "Analysis task aborted");
            context
                .store
                .fail(analysis_id, format!("analysis aborted: {}", e))
                .await
                .map(|_| AnalysisStatus::Failed)
        }
    };

    match stored {
        Ok(status) => {
            info!(status = %status, "Analysis finished");
            status
        }
        Err(e) => {
            error!(error = %e, "Could not store analysis outcome");
            if let Err(e) = context.store.fail(analysis_id, e.to_string()).await {
                error!(error = %e, "Could not mark analysis as failed");
            }
            AnalysisStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderPage, StaticProvider};
    use async_trait::async_trait;
    use fto_common::models::{AnalysisRecord, ResearchProfile, SearchRequest};
    use fto_common::{InMemoryAnalysisStore, ScoringConfig};
    use fto_risk::ProviderQuery;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    struct SlowProvider;

    #[async_trait]
    impl PatentProvider for SlowProvider {
        async fn search(&self, _query: &ProviderQuery) -> Result<ProviderPage> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ProviderPage::default())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn profile() -> ResearchProfile {
        ResearchProfile {
            title: "Lidar mapping".to_string(),
            description: "A study of solid-state lidar for low-cost indoor mapping robots.".to_string(),
            researcher_name: None,
        }
    }

    async fn submitted(
        store: &Arc<InMemoryAnalysisStore>,
        engine: &RiskEngine,
    ) -> (Uuid, PreparedSearch) {
        let request = SearchRequest::new(["lidar"]);
        let record = AnalysisRecord::new(profile(), request.clone());
        let id = record.id;
        assert_ok!(store.insert(record).await);
        (id, assert_ok!(engine.prepare(&request)))
    }

    #[tokio::test]
    async fn test_job_runs_to_completion() {
        let engine = Arc::new(RiskEngine::new(ScoringConfig::default()).unwrap());
        let store = Arc::new(InMemoryAnalysisStore::new());
        let provider = Arc::new(StaticProvider::new(vec![
            json!({"id": "US1", "title": "Lidar scanner", "grant_date": "2024-02-01"}),
        ]));

        let (pool, _handles) =
            WorkerPool::spawn(&WorkerConfig::default(), engine.clone(), store.clone(), provider);

        let (id, prepared) = submitted(&store, &engine).await;
        let completion = pool.submit(id, prepared).unwrap();
        assert_eq!(completion.await.unwrap(), AnalysisStatus::Completed);

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        let result = record.result.unwrap();
        assert_eq!(result.assessment.total_analyzed, 1);
        assert!(pool.is_running());
    }

    #[tokio::test]
    async fn test_full_queue_is_rejected() {
        let engine = Arc::new(RiskEngine::new(ScoringConfig::default()).unwrap());
        let store = Arc::new(InMemoryAnalysisStore::new());
        let config = WorkerConfig {
            concurrency: 1,
            queue_capacity: 1,
        };
        let (pool, _handles) =
            WorkerPool::spawn(&config, engine.clone(), store.clone(), Arc::new(SlowProvider));

        // First job occupies the worker, second fills the queue
        let (id, prepared) = submitted(&store, &engine).await;
        let _first = pool.submit(id, prepared).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (id, prepared) = submitted(&store, &engine).await;
        let _second = pool.submit(id, prepared).unwrap();

        let (id, prepared) = submitted(&store, &engine).await;
        let err = assert_err!(pool.submit(id, prepared));
        assert!(matches!(err, AppError::QueueError { .. }));
        assert_eq!(pool.queue_depth(), 1);
    }
}
