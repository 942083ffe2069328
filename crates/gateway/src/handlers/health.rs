//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub store: CheckResult,
    pub workers: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn up() -> Self {
        Self {
            status: "up".to_string(),
            latency_ms: None,
            queue_depth: None,
            error: None,
        }
    }

    fn down(error: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            queue_depth: None,
            error: Some(error.into()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: fto_common::VERSION.to_string(),
    })
}

/// Readiness probe - checks the store and the worker pool
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let store_check = match state.store.ping().await {
        Ok(_) => CheckResult {
            latency_ms: Some(start.elapsed().as_millis() as u64),
            ..CheckResult::up()
        },
        Err(e) => CheckResult::down(e.to_string()),
    };

    let worker_check = if state.workers.is_running() {
        CheckResult {
            queue_depth: Some(state.workers.queue_depth()),
            ..CheckResult::up()
        }
    } else {
        CheckResult::down("analysis workers have stopped")
    };

    let all_healthy = store_check.is_up() && worker_check.is_up();

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            store: store_check,
            workers: worker_check,
        },
    })
}
