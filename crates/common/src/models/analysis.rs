//! Analysis lifecycle and assembled results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::{OverallAssessment, SearchRequest};

/// Analysis status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of the research being checked, used by reports only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ResearchProfile {
    #[validate(length(min = 1, max = 500))]
    pub title: String,

    #[validate(length(min = 50))]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researcher_name: Option<String>,
}

/// Output of the result assembler, consumed by report rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub request: SearchRequest,

    /// Keywords after trimming and deduplication
    pub keywords: Vec<String>,

    pub assessment: OverallAssessment,

    pub recommendations: Vec<String>,

    /// Raw provider records dropped by the normalizer
    pub skipped_records: usize,

    /// Matches reported by the provider, which may exceed the records fetched
    pub total_matched: u64,

    /// Set when the provider call failed and the empty assessment was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,

    pub assessed_at: DateTime<Utc>,
}

/// Persisted analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub profile: ResearchProfile,
    pub request: SearchRequest,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(profile: ResearchProfile, request: SearchRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            profile,
            request,
            status: AnalysisStatus::Pending,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!AnalysisStatus::Pending.is_terminal());
        assert!(!AnalysisStatus::Analyzing.is_terminal());
        assert!(AnalysisStatus::Completed.is_terminal());
        assert!(AnalysisStatus::Failed.is_terminal());
        assert_eq!(serde_json::to_string(&AnalysisStatus::Analyzing).unwrap(), "\"analyzing\"");
    }

    #[test]
    fn test_profile_requires_long_description() {
        let profile = ResearchProfile {
            title: "Base editing".into(),
            description: "too short".into(),
            researcher_name: None,
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_new_record_is_pending() {
        let profile = ResearchProfile {
            title: "Base editing".into(),
            description: "x".repeat(60),
            researcher_name: Some("A. Researcher".into()),
        };
        let record = AnalysisRecord::new(profile, SearchRequest::new(["base editing"]));
        assert_eq!(record.status, AnalysisStatus::Pending);
        assert!(record.result.is_none());
        assert_eq!(record.created_at, record.updated_at);
    }
}
