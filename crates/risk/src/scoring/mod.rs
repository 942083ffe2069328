//! Per-patent risk scoring
//!
//! Each [`PatentRecord`] gets four sub-scores, a weighted composite, a level
//! from the shared thresholds and a templated explanation. Scoring is pure:
//! the evaluation date is fixed in the [`ScoringContext`] so results are
//! reproducible.

mod explain;
mod factors;

pub use explain::{dominant_factor, explanation, Factor};

use chrono::NaiveDate;
use fto_common::config::ScoringConfig;
use fto_common::models::{PatentRecord, RiskFactors, RiskLevel, ScoredPatent};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

/// Whole-word matcher for one lowercased keyword
#[derive(Debug, Clone)]
pub(crate) enum KeywordMatcher {
    Pattern(Regex),
    Substring(String),
}

impl KeywordMatcher {
    fn new(keyword: &str) -> Self {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';

        let mut pattern = String::new();
        if keyword.starts_with(is_word) {
            pattern.push_str(r"\b");
        }
        pattern.push_str(&regex::escape(keyword));
        if keyword.ends_with(is_word) {
            pattern.push_str(r"\b");
        }

        match Regex::new(&pattern) {
            Ok(regex) => KeywordMatcher::Pattern(regex),
            Err(e) => {
                tracing::debug!(keyword, error = %e, "Falling back to substring keyword match");
                KeywordMatcher::Substring(keyword.to_string())
            }
        }
    }

    /// `text` must already be lowercased
    pub(crate) fn is_match(&self, text: &str) -> bool {
        match self {
            KeywordMatcher::Pattern(regex) => regex.is_match(text),
            KeywordMatcher::Substring(keyword) => text.contains(keyword.as_str()),
        }
    }
}

/// Request-level inputs shared by every record in a batch
#[derive(Debug, Clone)]
pub struct ScoringContext {
    keywords: Vec<String>,
    matchers: Vec<KeywordMatcher>,
    field_of_study: Option<String>,
    as_of: NaiveDate,
}

impl ScoringContext {
    /// Keywords are trimmed, lowercased and deduplicated here.
    pub fn new<I, S>(keywords: I, field_of_study: Option<&str>, as_of: NaiveDate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.clone()))
            .collect();

        let matchers = keywords.iter().map(|k| KeywordMatcher::new(k)).collect();

        let field_of_study = field_of_study
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        Self {
            keywords,
            matchers,
            field_of_study,
            as_of,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn field_of_study(&self) -> Option<&str> {
        self.field_of_study.as_deref()
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub(crate) fn matchers(&self) -> &[KeywordMatcher] {
        &self.matchers
    }
}

/// Computes factors, composite score, level and explanation
#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: Arc<ScoringConfig>,
}

impl RiskScorer {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    pub fn factors(&self, context: &ScoringContext, record: &PatentRecord) -> RiskFactors {
        RiskFactors {
            keyword_overlap: factors::keyword_overlap(context, &record.title),
            classification_match: factors::classification_match(
                &self.config,
                context.field_of_study(),
                &record.classifications,
            ),
            recency: factors::recency(record.grant_date, context.as_of()),
            applicant_type: factors::applicant_type(&record.applicants),
        }
    }

    /// Weighted sum of the factors, clamped to [0, 1]
    pub fn composite(&self, factors: &RiskFactors) -> f64 {
        let w = &self.config.weights;
        let score = factors.keyword_overlap * w.keyword
            + factors.classification_match * w.classification
            + factors.recency * w.recency
            + factors.applicant_type * w.applicant;

        score.clamp(0.0, 1.0)
    }

    pub fn level(&self, score: f64) -> RiskLevel {
        RiskLevel::from_score(score, &self.config.thresholds)
    }

    pub fn score(&self, context: &ScoringContext, record: &PatentRecord) -> ScoredPatent {
        self.score_owned(context, record.clone())
    }

    pub fn score_owned(&self, context: &ScoringContext, record: PatentRecord) -> ScoredPatent {
        let factors = self.factors(context, &record);
        let risk_score = self.composite(&factors);
        let risk_level = self.level(risk_score);
        let dominant = dominant_factor(&factors, &self.config.weights);

        ScoredPatent {
            record,
            risk_score,
            risk_level,
            factors,
            explanation: explanation(risk_level, dominant).to_string(),
        }
    }
}
