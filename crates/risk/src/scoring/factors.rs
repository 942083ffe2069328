//! The four risk sub-scores. Each is total and lands in [0, 1].

use chrono::NaiveDate;
use fto_common::config::ScoringConfig;

use super::ScoringContext;

/// Recency when the grant date is missing or could not be parsed
pub const UNKNOWN_RECENCY: f64 = 0.5;

/// (maximum age in years, score) for recency, checked in order
const RECENCY_BUCKETS: &[(f64, f64)] = &[(5.0, 1.0), (10.0, 0.7), (15.0, 0.4)];
const OLDEST_RECENCY: f64 = 0.2;

const CORPORATE_MARKERS: &[&str] = &["inc.", "corp.", "company", "llc"];
const ACADEMIC_MARKERS: &[&str] = &["university", "institute", "college"];

pub const CORPORATE_APPLICANT: f64 = 0.8;
pub const ACADEMIC_APPLICANT: f64 = 0.5;
pub const INDIVIDUAL_APPLICANT: f64 = 0.3;
pub const UNKNOWN_APPLICANT: f64 = 0.5;

const DAYS_PER_YEAR: f64 = 365.25;

/// Share of keywords found as whole words in the title.
pub fn keyword_overlap(context: &ScoringContext, title: &str) -> f64 {
    if context.keyword_count() == 0 {
        return 0.0;
    }

    let title = title.trim().to_lowercase();
    if title.is_empty() {
        return 0.0;
    }

    let matches = context
        .matchers()
        .iter()
        .filter(|matcher| matcher.is_match(&title))
        .count();

    matches as f64 / context.keyword_count() as f64
}

/// How many of the leading classification codes fall under the field's
/// CPC prefixes, saturating at `classification_saturation` matches.
pub fn classification_match(
    config: &ScoringConfig,
    field_of_study: Option<&str>,
    classifications: &[String],
) -> f64 {
    let prefixes = field_of_study.and_then(|field| config.prefixes_for(field));

    let prefixes = match prefixes {
        Some(prefixes) if !classifications.is_empty() => prefixes,
        _ => return config.unknown_classification_score,
    };

    let matches = classifications
        .iter()
        .take(config.classification_cap)
        .filter(|code| {
            let code = code.trim().to_uppercase();
            prefixes
                .iter()
                .any(|prefix| code.starts_with(&prefix.trim().to_uppercase()))
        })
        .count();

    (matches as f64 / config.classification_saturation as f64).min(1.0)
}

/// Newer grants carry live, enforceable risk.
pub fn recency(grant_date: Option<NaiveDate>, as_of: NaiveDate) -> f64 {
    let Some(granted) = grant_date else {
        return UNKNOWN_RECENCY;
    };

    let years_old = (as_of - granted).num_days() as f64 / DAYS_PER_YEAR;

    RECENCY_BUCKETS
        .iter()
        .find(|(max_years, _)| years_old < *max_years)
        .map(|(_, score)| *score)
        .unwrap_or(OLDEST_RECENCY)
}

/// Applicant tier from corporate and academic markers in the names.
/// Only an empty list is unknown; blank names still count as individuals.
pub fn applicant_type(applicants: &[String]) -> f64 {
    if applicants.is_empty() {
        return UNKNOWN_APPLICANT;
    }

    let text = applicants.join(" ").to_lowercase();

    if CORPORATE_MARKERS.iter().any(|marker| text.contains(marker)) {
        CORPORATE_APPLICANT
    } else if ACADEMIC_MARKERS.iter().any(|marker| text.contains(marker)) {
        ACADEMIC_APPLICANT
    } else {
        INDIVIDUAL_APPLICANT
    }
}
