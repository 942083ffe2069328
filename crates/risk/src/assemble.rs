//! Result assembly

use chrono::{DateTime, Utc};
use fto_common::models::{AnalysisResult, OverallAssessment};

use crate::engine::PreparedSearch;

/// Where the scored records came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub skipped_records: usize,
    pub total_matched: u64,
    pub provider_error: Option<String>,
}

impl Provenance {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            provider_error: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Packages engine output for persistence and report rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn assemble(
        &self,
        prepared: &PreparedSearch,
        assessment: OverallAssessment,
        recommendations: Vec<String>,
        provenance: Provenance,
    ) -> AnalysisResult {
        self.assemble_at(prepared, assessment, recommendations, provenance, Utc::now())
    }

    pub fn assemble_at(
        &self,
        prepared: &PreparedSearch,
        assessment: OverallAssessment,
        recommendations: Vec<String>,
        provenance: Provenance,
        assessed_at: DateTime<Utc>,
    ) -> AnalysisResult {
        AnalysisResult {
            request: prepared.request.clone(),
            keywords: prepared.context.keywords().to_vec(),
            assessment,
            recommendations,
            skipped_records: provenance.skipped_records,
            total_matched: provenance.total_matched,
            provider_error: provenance.provider_error,
            assessed_at,
        }
    }
}
