//! Freedom-to-operate report rendering
//!
//! Builds the researcher-facing report from a completed analysis. All
//! scores are rounded to three decimals here and nowhere else.

use chrono::{DateTime, NaiveDate, Utc};
use fto_common::errors::{AppError, Result};
use fto_common::models::{
    AnalysisRecord, AnalysisResult, ResearchProfile, RiskFactors, RiskLevel, ScoredPatent,
};
use serde::Serialize;
use uuid::Uuid;

pub const REPORT_VERSION: &str = "1.0";
pub const REPORT_TYPE: &str = "Freedom to Operate Analysis";

/// Patents listed in the patent analysis section
const REPORTED_PATENTS: usize = 5;
/// Applicants listed per patent
const REPORTED_APPLICANTS: usize = 2;

const DISCLAIMER: &str = "This report is generated by an automated system for educational and \
preliminary assessment purposes only. It does not constitute legal advice. Patent law is complex \
and fact-specific. For definitive FTO analysis, please consult with a qualified patent attorney \
or IP professional. The absence of identified patents does not guarantee freedom to operate, as \
this search may not be exhaustive.";

#[derive(Debug, Clone, Serialize)]
pub struct FtoReport {
    pub report_metadata: ReportMetadata,
    pub executive_summary: String,
    pub research_overview: ResearchOverview,
    pub risk_assessment: RiskSummary,
    pub patent_analysis: Vec<PatentSummary>,
    pub recommendations: ReportRecommendations,
    pub educational_notes: EducationalNotes,
    pub disclaimer: String,
    /// Present when the patent search failed and the report reflects no data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_caveat: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_date: DateTime<Utc>,
    pub report_version: String,
    pub analysis_id: Uuid,
    pub report_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchOverview {
    pub title: String,
    pub field: Option<String>,
    pub keywords: Vec<String>,
    pub researcher: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskSummary {
    pub overall_risk: RiskLevel,
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub patents_analyzed: usize,
    pub high_risk_count: usize,
    pub total_matched: u64,
    pub skipped_records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatentSummary {
    pub patent_number: String,
    pub title: String,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub grant_date: Option<NaiveDate>,
    pub applicants: String,
    pub relevance: String,
    pub risk_breakdown: RiskFactors,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRecommendations {
    pub immediate_actions: Vec<String>,
    pub general_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EducationalNotes {
    pub what_is_fto: String,
    pub risk_levels_explained: RiskLevelsExplained,
    pub understanding_scores: String,
    pub next_steps: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RiskLevelsExplained {
    pub high: String,
    pub medium: String,
    pub low: String,
}

/// Render the report for a stored analysis. Fails until it has a result.
pub fn render(record: &AnalysisRecord) -> Result<FtoReport> {
    let result = record.result.as_ref().ok_or_else(|| AppError::AnalysisNotReady {
        id: record.id.to_string(),
        status: record.status.to_string(),
    })?;

    Ok(render_at(record.id, &record.profile, result, Utc::now()))
}

pub fn render_at(
    analysis_id: Uuid,
    profile: &ResearchProfile,
    result: &AnalysisResult,
    generated_date: DateTime<Utc>,
) -> FtoReport {
    let assessment = &result.assessment;

    FtoReport {
        report_metadata: ReportMetadata {
            generated_date,
            report_version: REPORT_VERSION.to_string(),
            analysis_id,
            report_type: REPORT_TYPE.to_string(),
        },
        executive_summary: executive_summary(&profile.title, assessment.level, assessment.total_analyzed),
        research_overview: ResearchOverview {
            title: profile.title.clone(),
            field: result.request.field().map(str::to_string),
            keywords: result.keywords.clone(),
            researcher: profile
                .researcher_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Not provided".to_string()),
        },
        risk_assessment: RiskSummary {
            overall_risk: assessment.level,
            risk_score: round3(assessment.score),
            risk_factors: assessment.factors.clone(),
            patents_analyzed: assessment.total_analyzed,
            high_risk_count: assessment.high_risk_count,
            total_matched: result.total_matched,
            skipped_records: result.skipped_records,
        },
        patent_analysis: assessment
            .analyzed_patents
            .iter()
            .take(REPORTED_PATENTS)
            .map(summarize)
            .collect(),
        recommendations: ReportRecommendations {
            immediate_actions: immediate_actions(assessment.level),
            general_recommendations: result.recommendations.clone(),
        },
        educational_notes: educational_notes(),
        disclaimer: DISCLAIMER.to_string(),
        search_caveat: result
            .provider_error
            .as_ref()
            .map(|reason| format!("Patent search failed ({}); no patents could be analyzed", reason)),
    }
}

fn summarize(patent: &ScoredPatent) -> PatentSummary {
    PatentSummary {
        patent_number: patent.record.id.clone(),
        title: patent.record.title.clone(),
        risk_level: patent.risk_level,
        risk_score: round3(patent.risk_score),
        grant_date: patent.record.grant_date,
        applicants: patent
            .record
            .applicants
            .iter()
            .take(REPORTED_APPLICANTS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        relevance: patent.explanation.clone(),
        risk_breakdown: RiskFactors {
            keyword_overlap: round3(patent.factors.keyword_overlap),
            classification_match: round3(patent.factors.classification_match),
            recency: round3(patent.factors.recency),
            applicant_type: round3(patent.factors.applicant_type),
        },
    }
}

fn executive_summary(title: &str, level: RiskLevel, patent_count: usize) -> String {
    match level {
        RiskLevel::High => format!(
            "Your research \"{title}\" has been analyzed for patent conflicts. We found \
             {patent_count} relevant patents with HIGH freedom-to-operate risk. This suggests \
             significant overlap with existing patents in your field. Immediate consultation \
             with IP legal counsel is strongly recommended before proceeding."
        ),
        RiskLevel::Medium => format!(
            "Your research \"{title}\" shows MODERATE freedom-to-operate risk. We identified \
             {patent_count} patents with some overlap to your work. While you can proceed with \
             caution, reviewing the specific patents listed below and potentially modifying your \
             approach could reduce legal risks."
        ),
        RiskLevel::Low => format!(
            "Good news! Your research \"{title}\" shows LOW freedom-to-operate risk. We analyzed \
             {patent_count} patents and found minimal overlap with your work. This suggests good \
             potential for novel contributions and potential IP protection."
        ),
    }
}

fn immediate_actions(level: RiskLevel) -> Vec<String> {
    let actions: &[&str] = match level {
        RiskLevel::High => &[
            "STOP: Do not proceed without legal review",
            "Contact your institution's technology transfer office",
            "Prepare detailed documentation of your research approach",
            "Schedule consultation with IP attorney",
        ],
        RiskLevel::Medium => &[
            "Review the identified patents carefully",
            "Document differences between your work and existing patents",
            "Consider minor modifications to avoid conflicts",
            "Monitor new patent filings in your area",
        ],
        RiskLevel::Low => &[
            "Proceed with your research",
            "Consider filing a provisional patent application",
            "Keep records of your development process",
            "Set up patent alerts for your keywords",
        ],
    };

    actions.iter().map(|a| a.to_string()).collect()
}

fn educational_notes() -> EducationalNotes {
    EducationalNotes {
        what_is_fto: "Freedom to Operate (FTO) analysis determines whether your research might \
                      infringe on existing patents."
            .to_string(),
        risk_levels_explained: RiskLevelsExplained {
            high: "Significant overlap with existing patents. Legal review essential.".to_string(),
            medium: "Some overlap exists. Proceed with caution and consider modifications.".to_string(),
            low: "Minimal overlap. Good opportunity for innovation.".to_string(),
        },
        understanding_scores: "Risk scores range from 0 (no risk) to 1 (high risk), based on \
                               keyword matches, technical classifications, and patent recency."
            .to_string(),
        next_steps: "This automated analysis is a starting point. For final decisions, always \
                     consult with qualified IP professionals."
            .to_string(),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use fto_common::models::{AnalysisStatus, OverallAssessment, PatentRecord, SearchRequest};

    fn profile() -> ResearchProfile {
        ResearchProfile {
            title: "Base editing in plants".to_string(),
            description: "Adapting CRISPR base editors for drought tolerance in staple crops.".to_string(),
            researcher_name: Some("  ".to_string()),
        }
    }

    fn scored(id: &str, score: f64, applicants: &[&str]) -> ScoredPatent {
        let mut record = PatentRecord::new(id, "CRISPR base editor", "US");
        record.applicants = applicants.iter().map(|a| a.to_string()).collect();
        ScoredPatent {
            record,
            risk_score: score,
            risk_level: RiskLevel::High,
            factors: RiskFactors {
                keyword_overlap: 2.0 / 3.0,
                classification_match: 1.0 / 3.0,
                recency: 1.0,
                applicant_type: 0.8,
            },
            explanation: "Strong keyword match indicates direct overlap with your research".to_string(),
        }
    }

    fn result(assessment: OverallAssessment, provider_error: Option<String>) -> AnalysisResult {
        AnalysisResult {
            request: SearchRequest::new(["crispr", "base editing"]).with_field_of_study(" biotechnology "),
            keywords: vec!["crispr".to_string(), "base editing".to_string()],
            assessment,
            recommendations: vec!["Consult with a patent attorney before proceeding".to_string()],
            skipped_records: 0,
            total_matched: 7,
            provider_error,
            assessed_at: Utc::now(),
        }
    }

    #[test]
    fn test_high_risk_report() {
        let patents: Vec<_> = (0..7)
            .map(|i| scored(&format!("US{}", i), 0.7777, &["Acme Inc.", "Beta LLC", "Gamma Corp."]))
            .collect();
        let assessment = OverallAssessment {
            level: RiskLevel::High,
            score: 0.7777,
            factors: vec!["7 high-risk patents identified".to_string()],
            analyzed_patents: patents,
            high_risk_count: 7,
            total_analyzed: 7,
        };

        let id = Uuid::new_v4();
        let report = render_at(id, &profile(), &result(assessment, None), Utc::now());

        assert_eq!(report.report_metadata.analysis_id, id);
        assert_eq!(report.report_metadata.report_version, "1.0");
        assert!(report.executive_summary.contains("\"Base editing in plants\""));
        assert!(report.executive_summary.contains("7 relevant patents with HIGH"));
        assert_eq!(report.research_overview.researcher, "Not provided");
        assert_eq!(report.research_overview.field.as_deref(), Some("biotechnology"));
        assert_eq!(report.risk_assessment.risk_score, 0.778);
        assert_eq!(report.patent_analysis.len(), 5);
        assert_eq!(report.patent_analysis[0].applicants, "Acme Inc., Beta LLC");
        assert_eq!(report.patent_analysis[0].risk_breakdown.keyword_overlap, 0.667);
        assert_eq!(
            report.recommendations.immediate_actions[0],
            "STOP: Do not proceed without legal review"
        );
        assert!(report.search_caveat.is_none());
    }

    #[test]
    fn test_provider_failure_caveat() {
        let report = render_at(
            Uuid::new_v4(),
            &profile(),
            &result(OverallAssessment::no_patents(), Some("timed out".to_string())),
            Utc::now(),
        );

        assert!(report.executive_summary.starts_with("Good news!"));
        assert!(report.patent_analysis.is_empty());
        assert!(report.search_caveat.unwrap().contains("timed out"));
    }

    #[test]
    fn test_render_requires_result() {
        let record = AnalysisRecord::new(profile(), SearchRequest::new(["crispr"]));
        let err = render(&record).unwrap_err();
        assert!(matches!(err, AppError::AnalysisNotReady { .. }));
        assert_eq!(record.status, AnalysisStatus::Pending);
    }

    #[test]
    fn test_risk_levels_serialize_upper_case() {
        let json = serde_json::to_value(educational_notes()).unwrap();
        assert!(json["risk_levels_explained"]["HIGH"].is_string());
    }
}
