//! The analysis pipeline
//!
//! [`RiskEngine`] wires the stages together:
//! 1. `prepare` validates the request, builds the provider query and fixes
//!    the scoring context (keywords, field of study, evaluation date)
//! 2. the caller runs the provider query and hands back a [`ProviderOutcome`]
//! 3. `analyze` normalizes, scores, aggregates and assembles the result
//!
//! The engine performs no I/O of its own.

use chrono::{NaiveDate, Utc};
use fto_common::config::ScoringConfig;
use fto_common::errors::Result;
use fto_common::metrics::record_analysis;
use fto_common::models::{AnalysisResult, OverallAssessment, PatentRecord, ScoredPatent, SearchRequest};
use serde_json::Value;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::Aggregator;
use crate::assemble::{Provenance, ResultAssembler};
use crate::normalize::RecordNormalizer;
use crate::query::{ProviderQuery, QueryBuilder};
use crate::recommend::recommendations;
use crate::scoring::{RiskScorer, ScoringContext};

/// Provider response as seen by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Success {
        records: Vec<Value>,
        /// Matches reported by the provider, may exceed `records.len()`
        total_matched: u64,
    },
    Failure {
        reason: String,
    },
}

impl ProviderOutcome {
    pub fn success(records: Vec<Value>) -> Self {
        let total_matched = records.len() as u64;
        ProviderOutcome::Success { records, total_matched }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ProviderOutcome::Failure { reason: reason.into() }
    }
}

/// A validated request ready to be sent to a provider
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    pub request: SearchRequest,
    pub query: ProviderQuery,
    pub context: ScoringContext,
}

/// Relevance and risk scoring engine
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: Arc<ScoringConfig>,
    builder: QueryBuilder,
    normalizer: RecordNormalizer,
    scorer: RiskScorer,
    aggregator: Aggregator,
    assembler: ResultAssembler,
}

impl RiskEngine {
    /// Create an engine, rejecting invalid weights or thresholds.
    pub fn new(config: ScoringConfig) -> Result<Self> {
        Self::with_shared(Arc::new(config))
    }

    pub fn with_shared(config: Arc<ScoringConfig>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            builder: QueryBuilder::new(config.clone()),
            normalizer: RecordNormalizer::new(config.classification_cap),
            scorer: RiskScorer::new(config.clone()),
            aggregator: Aggregator::new(config.clone()),
            assembler: ResultAssembler,
            config,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Prepare a search evaluated as of today (UTC).
    pub fn prepare(&self, request: &SearchRequest) -> Result<PreparedSearch> {
        self.prepare_at(request, Utc::now().date_naive())
    }

    pub fn prepare_at(&self, request: &SearchRequest, as_of: NaiveDate) -> Result<PreparedSearch> {
        let query = self.builder.build(request)?;
        let context = ScoringContext::new(query.terms(), request.field(), as_of);

        Ok(PreparedSearch {
            request: request.clone(),
            query,
            context,
        })
    }

    /// Turn a provider outcome into an assembled result.
    ///
    /// A failed provider call yields the empty assessment with the failure
    /// reason recorded on the result.
    #[instrument(skip_all, fields(keywords = prepared.context.keyword_count()))]
    pub async fn analyze(&self, prepared: &PreparedSearch, outcome: ProviderOutcome) -> AnalysisResult {
        let start = Instant::now();

        let (assessment, provenance) = match outcome {
            ProviderOutcome::Success { records, total_matched } => {
                let batch = self
                    .normalizer
                    .normalize_batch(&records, &prepared.query.jurisdiction);

                debug!(
                    received = records.len(),
                    normalized = batch.records.len(),
                    skipped = batch.skipped,
                    "Normalized provider records"
                );

                let scored = self.score_batch(&prepared.context, batch.records).await;
                let provenance = Provenance {
                    skipped_records: batch.skipped,
                    total_matched,
                    provider_error: None,
                };

                (self.aggregator.aggregate(scored), provenance)
            }
            ProviderOutcome::Failure { reason } => {
                warn!(reason = %reason, "Provider failed, reporting empty assessment");
                (OverallAssessment::no_patents(), Provenance::failed(reason))
            }
        };

        let recommendations = recommendations(&assessment);
        let result = self
            .assembler
            .assemble(prepared, assessment, recommendations, provenance);

        let duration = start.elapsed();
        record_analysis(
            duration.as_secs_f64(),
            result.assessment.level.as_str(),
            result.assessment.total_analyzed,
            result.skipped_records,
        );

        info!(
            level = %result.assessment.level,
            score = result.assessment.score,
            patents = result.assessment.total_analyzed,
            high_risk = result.assessment.high_risk_count,
            duration_ms = duration.as_millis() as u64,
            "Analysis complete"
        );

        result
    }

    /// Score and aggregate already-normalized records on the current thread.
    pub fn assess(&self, context: &ScoringContext, records: Vec<PatentRecord>) -> OverallAssessment {
        let scored = records
            .into_iter()
            .map(|record| self.scorer.score_owned(context, record))
            .collect();

        self.aggregator.aggregate(scored)
    }

    /// Score records in input order, on blocking threads once the batch
    /// reaches the configured threshold.
    async fn score_batch(&self, context: &ScoringContext, records: Vec<PatentRecord>) -> Vec<ScoredPatent> {
        if records.len() < self.config.parallel_threshold {
            return records
                .into_iter()
                .map(|record| self.scorer.score_owned(context, record))
                .collect();
        }

        let records = Arc::new(records);
        let context = Arc::new(context.clone());
        let ranges = chunk_ranges(records.len(), worker_count());

        let tasks = ranges.iter().cloned().map(|range| {
            let records = records.clone();
            let context = context.clone();
            let scorer = self.scorer.clone();
            tokio::task::spawn_blocking(move || {
                records[range]
                    .iter()
                    .map(|record| scorer.score(&context, record))
                    .collect::<Vec<_>>()
            })
        });

        let results = futures::future::join_all(tasks).await;

        let mut scored = Vec::with_capacity(records.len());
        for (range, result) in ranges.into_iter().zip(results) {
            match result {
                Ok(chunk) => scored.extend(chunk),
                Err(e) => {
                    warn!(error = %e, start = range.start, end = range.end, "Scoring task failed, retrying inline");
                    scored.extend(
                        records[range]
                            .iter()
                            .map(|record| self.scorer.score(&context, record)),
                    );
                }
            }
        }

        scored
    }
}

fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Split `0..len` into at most `parts` contiguous, non-empty ranges.
fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }

    let size = len.div_ceil(parts.max(1));
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fto_common::models::RiskLevel;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn engine() -> RiskEngine {
        RiskEngine::new(ScoringConfig::default()).unwrap()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn crispr_request() -> SearchRequest {
        SearchRequest::new(["CRISPR", "gene editing"]).with_field_of_study("biotechnology")
    }

    fn crispr_record(id: &str) -> Value {
        json!({
            "patent_number": id,
            "patent_title": "CRISPR gene editing method",
            "patent_date": "2023-06-01",
            "assignees": [{"assignee_organization": "Broad Institute Inc."}],
            "cpcs": [{"cpc_subgroup_id": "C12N15/90"}]
        })
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ScoringConfig::default();
        config.weights.keyword = 0.9;
        assert!(RiskEngine::new(config).is_err());
    }

    #[test]
    fn test_prepare_rejects_bad_requests() {
        let engine = engine();
        assert_err!(engine.prepare(&SearchRequest::new(Vec::<String>::new())));
        assert_err!(engine.prepare(&SearchRequest::new(["  "])));
        assert_err!(engine.prepare(&SearchRequest::new(["a"]).with_limit(0)));

        let too_many: Vec<String> = (0..11).map(|i| format!("k{}", i)).collect();
        assert_err!(engine.prepare(&SearchRequest::new(too_many)));

        let ten: Vec<String> = (0..10).map(|i| format!("k{}", i)).collect();
        assert_ok!(engine.prepare(&SearchRequest::new(ten)));
    }

    #[tokio::test]
    async fn test_end_to_end_example() {
        let engine = engine();
        let prepared = engine.prepare_at(&crispr_request(), as_of()).unwrap();

        let outcome = ProviderOutcome::Success {
            records: vec![crispr_record("US1"), json!({"patent_title": "no id"})],
            total_matched: 140,
        };
        let result = engine.analyze(&prepared, outcome).await;

        let assessment = &result.assessment;
        assert_eq!(assessment.level, RiskLevel::High);
        assert!((assessment.score - 0.78).abs() < 1e-3);
        assert_eq!(assessment.high_risk_count, 1);
        assert_eq!(assessment.total_analyzed, 1);
        assert_eq!(result.skipped_records, 1);
        assert_eq!(result.total_matched, 140);
        assert!(result.provider_error.is_none());
        assert_eq!(result.keywords, vec!["crispr", "gene editing"]);
        assert_eq!(
            result.recommendations.last().map(String::as_str),
            Some("Refine your research keywords to differentiate from existing work")
        );
    }

    #[tokio::test]
    async fn test_empty_provider_result() {
        let engine = engine();
        let prepared = engine.prepare_at(&crispr_request(), as_of()).unwrap();
        let result = engine.analyze(&prepared, ProviderOutcome::success(Vec::new())).await;

        assert_eq!(result.assessment, OverallAssessment::no_patents());
        assert_eq!(result.recommendations[0], "No existing patents found for your keywords");
    }

    #[tokio::test]
    async fn test_provider_failure_is_a_caveat() {
        let engine = engine();
        let prepared = engine.prepare_at(&crispr_request(), as_of()).unwrap();
        let result = engine
            .analyze(&prepared, ProviderOutcome::failure("connection reset"))
            .await;

        assert_eq!(result.assessment, OverallAssessment::no_patents());
        assert_eq!(result.provider_error.as_deref(), Some("connection reset"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_scoring_matches_sequential() {
        let engine = engine();
        let prepared = engine.prepare_at(&crispr_request(), as_of()).unwrap();

        let raws: Vec<Value> = (0..200)
            .map(|i| {
                json!({
                    "patent_number": format!("US{}", i),
                    "patent_title": if i % 3 == 0 { "CRISPR delivery" } else { "Gene editing vector" },
                    "patent_date": format!("{}-01-01", 1990 + i % 35),
                })
            })
            .collect();

        let result = engine
            .analyze(&prepared, ProviderOutcome::success(raws.clone()))
            .await;

        let batch = RecordNormalizer::new(5).normalize_batch(&raws, "US");
        let sequential = engine.assess(&prepared.context, batch.records);

        assert_eq!(result.assessment, sequential);
        assert_eq!(result.assessment.total_analyzed, 200);
    }

    #[test]
    fn test_chunk_ranges_cover_input() {
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
        assert_eq!(chunk_ranges(3, 8), vec![0..1, 1..2, 2..3]);
        assert_eq!(chunk_ranges(5, 0), vec![0..5]);
    }
}
