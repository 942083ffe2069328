//! Analysis handlers
//!
//! - `POST /v1/analyses` queues an analysis and returns immediately
//! - `GET /v1/analyses/{id}` reports its status
//! - `GET /v1/analyses/{id}/risk` and `/report` serve the finished result
//! - `POST /v1/assess` runs the whole pipeline inside the request

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fto_common::{
    errors::{AppError, Result},
    models::{AnalysisRecord, AnalysisResult, AnalysisStatus, ResearchProfile, RiskLevel, SearchRequest},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::provider;
use crate::report::{self, FtoReport};
use crate::AppState;

/// Request to analyze a piece of research
#[derive(Debug, Deserialize)]
pub struct CreateAnalysisRequest {
    #[serde(flatten)]
    pub profile: ResearchProfile,

    #[serde(flatten)]
    pub search: SearchRequest,
}

/// Response after queueing an analysis
#[derive(Serialize)]
pub struct CreateAnalysisResponse {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
    pub poll_url: String,
}

/// Status of a stored analysis
#[derive(Serialize)]
pub struct AnalysisStatusResponse {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_risk: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AnalysisRecord> for AnalysisStatusResponse {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            analysis_id: record.id,
            status: record.status,
            title: record.profile.title.clone(),
            overall_risk: record.result.as_ref().map(|r| r.assessment.level),
            error_message: record.error_message.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Validate, persist and queue a new analysis
pub async fn create_analysis(
    State(state): State<AppState>,
    Json(request): Json<CreateAnalysisRequest>,
) -> Result<(StatusCode, Json<CreateAnalysisResponse>)> {
    request.profile.validate()?;
    let prepared = state.engine.prepare(&request.search)?;
    request.search.validate()?;

    let record = AnalysisRecord::new(request.profile, request.search);
    let analysis_id = record.id;
    let keyword_count = prepared.context.keyword_count();
    state.store.insert(record).await?;

    if let Err(e) = state.workers.submit(analysis_id, prepared) {
        state.store.fail(analysis_id, e.to_string()).await?;
        return Err(e);
    }

    tracing::info!(
        analysis_id = %analysis_id,
        keywords = keyword_count,
        "Analysis queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateAnalysisResponse {
            analysis_id,
            status: AnalysisStatus::Pending,
            poll_url: format!("/v1/analyses/{}", analysis_id),
        }),
    ))
}

/// Get analysis status
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<AnalysisStatusResponse>> {
    let record = find(&state, analysis_id).await?;
    Ok(Json(AnalysisStatusResponse::from(&record)))
}

/// Get the assembled risk result of a completed analysis
pub async fn get_risk(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<AnalysisResult>> {
    let record = find(&state, analysis_id).await?;
    let status = record.status;

    record.result.map(Json).ok_or_else(|| AppError::AnalysisNotReady {
        id: analysis_id.to_string(),
        status: status.to_string(),
    })
}

/// Get the FTO report of a completed analysis
pub async fn get_report(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<FtoReport>> {
    let record = find(&state, analysis_id).await?;
    Ok(Json(report::render(&record)?))
}

/// Run an analysis synchronously without persisting it
pub async fn assess(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<AnalysisResult>> {
    let prepared = state.engine.prepare(&request)?;
    request.validate()?;

    let outcome = provider::fetch(state.provider.as_ref(), &prepared.query).await;
    let result = state.engine.analyze(&prepared, outcome).await;

    Ok(Json(result))
}

async fn find(state: &AppState, analysis_id: Uuid) -> Result<AnalysisRecord> {
    state
        .store
        .get(analysis_id)
        .await?
        .ok_or_else(|| AppError::AnalysisNotFound {
            id: analysis_id.to_string(),
        })
}
