//! Action recommendations for an overall assessment

use fto_common::models::{OverallAssessment, RiskLevel};

const HIGH_RISK: &[&str] = &[
    "Consult with a patent attorney before proceeding",
    "Conduct a detailed patent landscape analysis",
    "Consider freedom-to-operate opinion from legal counsel",
    "Explore licensing opportunities for high-risk patents",
];

const MEDIUM_RISK: &[&str] = &[
    "Review high-risk patents carefully",
    "Document how your research differs from existing patents",
    "Consider collaboration with patent holders",
    "Design around existing patent claims",
];

const LOW_RISK: &[&str] = &[
    "Low patent conflict risk identified",
    "Continue monitoring new patents in your field",
    "Consider filing your own patents",
    "Update this analysis periodically",
];

const NO_PATENTS: &[&str] = &[
    "No existing patents found for your keywords",
    "Excellent opportunity for novel IP",
    "Consider filing a provisional patent",
    "Re-run analysis with broader keywords to ensure coverage",
];

const REFINE_KEYWORDS: &str = "Refine your research keywords to differentiate from existing work";
const REFINE_KEYWORDS_OVERLAP: f64 = 0.7;

/// Level-specific advice, plus a keyword hint when the top patent's title
/// overlaps heavily with the research keywords.
pub fn recommendations(assessment: &OverallAssessment) -> Vec<String> {
    if assessment.is_empty() {
        return to_owned(NO_PATENTS);
    }

    let mut recommendations = match assessment.level {
        RiskLevel::High => to_owned(HIGH_RISK),
        RiskLevel::Medium => to_owned(MEDIUM_RISK),
        RiskLevel::Low => to_owned(LOW_RISK),
    };

    let strong_overlap = assessment
        .top()
        .is_some_and(|top| top.factors.keyword_overlap > REFINE_KEYWORDS_OVERLAP);
    if strong_overlap {
        recommendations.push(REFINE_KEYWORDS.to_string());
    }

    recommendations
}

fn to_owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}
