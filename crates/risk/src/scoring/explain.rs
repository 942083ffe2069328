//! Explanation templates keyed by risk level and dominant factor

use fto_common::config::FactorWeights;
use fto_common::models::{RiskFactors, RiskLevel};
use serde::{Deserialize, Serialize};

/// One of the four scoring factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Keyword,
    Classification,
    Recency,
    Applicant,
}

impl Factor {
    /// Tie-break order for the dominant factor
    pub const ALL: [Factor; 4] = [
        Factor::Keyword,
        Factor::Classification,
        Factor::Recency,
        Factor::Applicant,
    ];

    /// Weighted contribution of this factor to the composite
    pub fn contribution(&self, factors: &RiskFactors, weights: &FactorWeights) -> f64 {
        match self {
            Factor::Keyword => factors.keyword_overlap * weights.keyword,
            Factor::Classification => factors.classification_match * weights.classification,
            Factor::Recency => factors.recency * weights.recency,
            Factor::Applicant => factors.applicant_type * weights.applicant,
        }
    }
}

/// Factor with the largest weighted contribution. Earlier factors win ties.
pub fn dominant_factor(factors: &RiskFactors, weights: &FactorWeights) -> Factor {
    let mut best = Factor::Keyword;
    let mut best_value = best.contribution(factors, weights);

    for factor in Factor::ALL.iter().skip(1) {
        let value = factor.contribution(factors, weights);
        if value > best_value {
            best = *factor;
            best_value = value;
        }
    }

    best
}

pub fn explanation(level: RiskLevel, dominant: Factor) -> &'static str {
    match (level, dominant) {
        (RiskLevel::High, Factor::Keyword) => {
            "Strong keyword match indicates direct overlap with your research"
        }
        (RiskLevel::High, Factor::Classification) => {
            "Patent classifications suggest work in the same technical field"
        }
        (RiskLevel::High, Factor::Recency) => {
            "Recently granted patent in closely related technology"
        }
        (RiskLevel::High, Factor::Applicant) => {
            "Commercial assignee holds a patent in closely related technology"
        }
        (RiskLevel::Medium, Factor::Keyword) => {
            "Moderate overlap - patent may cover related technology"
        }
        (RiskLevel::Medium, Factor::Classification) => {
            "Moderate overlap - patent is classified in a related technical field"
        }
        (RiskLevel::Medium, Factor::Recency) => {
            "Moderate overlap - recent patent in a neighbouring area"
        }
        (RiskLevel::Medium, Factor::Applicant) => {
            "Moderate overlap - assignee profile suggests related commercial activity"
        }
        (RiskLevel::Low, Factor::Keyword) => {
            "Limited overlap - patent appears to be in a different area"
        }
        (RiskLevel::Low, Factor::Classification) => {
            "Limited overlap - shares only a broad technical classification"
        }
        (RiskLevel::Low, Factor::Recency) => {
            "Limited overlap - relevance comes mostly from grant recency"
        }
        (RiskLevel::Low, Factor::Applicant) => {
            "Limited overlap - relevance comes mostly from the assignee type"
        }
    }
}
