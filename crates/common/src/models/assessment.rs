//! Risk scores, per-patent and overall

use serde::{Deserialize, Serialize};
use std::fmt;

use super::PatentRecord;
use crate::config::RiskThresholds;

/// Factor string used by the empty-result assessment
pub const NO_PATENTS_FACTOR: &str = "No relevant patents found";

/// Risk band derived from a composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a composite score onto a band.
    ///
    /// This is the only place where thresholds are compared, so per-patent
    /// and overall levels always agree with their scores.
    pub fn from_score(score: f64, thresholds: &RiskThresholds) -> Self {
        if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four sub-scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskFactors {
    pub keyword_overlap: f64,
    pub classification_match: f64,
    pub recency: f64,
    pub applicant_type: f64,
}

/// A patent record annotated with its risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPatent {
    pub record: PatentRecord,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub factors: RiskFactors,
    pub explanation: String,
}

/// Overall verdict for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub level: RiskLevel,
    pub score: f64,
    /// Human-readable risk drivers, in a fixed order
    pub factors: Vec<String>,
    /// Ranked by score, truncated to the configured top N
    pub analyzed_patents: Vec<ScoredPatent>,
    pub high_risk_count: usize,
    /// Size of the full input, before truncation
    pub total_analyzed: usize,
}

impl OverallAssessment {
    /// Terminal assessment for an empty result set or a failed provider call.
    pub fn no_patents() -> Self {
        Self {
            level: RiskLevel::Low,
            score: 0.0,
            factors: vec![NO_PATENTS_FACTOR.to_string()],
            analyzed_patents: Vec::new(),
            high_risk_count: 0,
            total_analyzed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_analyzed == 0
    }

    pub fn top(&self) -> Option<&ScoredPatent> {
        self.analyzed_patents.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries_are_inclusive() {
        let t = RiskThresholds::default();
        assert_eq!(RiskLevel::from_score(0.7, &t), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.6999, &t), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.4, &t), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.3999, &t), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.0, &t), RiskLevel::Low);
    }

    #[test]
    fn test_level_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"MEDIUM\"");
        let level: RiskLevel = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(level, RiskLevel::High);
    }

    #[test]
    fn test_no_patents_assessment() {
        let assessment = OverallAssessment::no_patents();
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.factors, vec!["No relevant patents found"]);
        assert!(assessment.analyzed_patents.is_empty());
        assert!(assessment.is_empty());
        assert!(assessment.top().is_none());
    }
}
