//! Search request submitted by a researcher

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::{DEFAULT_JURISDICTION, DEFAULT_RESULT_LIMIT, MAX_KEYWORDS};

/// Keywords, field of study, jurisdiction and result limit for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 10))]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,

    #[serde(default = "default_jurisdiction")]
    #[validate(length(min = 1, max = 8))]
    pub jurisdiction: String,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1))]
    pub limit: usize,
}

fn default_jurisdiction() -> String { DEFAULT_JURISDICTION.to_string() }
fn default_limit() -> usize { DEFAULT_RESULT_LIMIT }

impl SearchRequest {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            field_of_study: None,
            jurisdiction: default_jurisdiction(),
            limit: default_limit(),
        }
    }

    pub fn with_field_of_study(mut self, field: impl Into<String>) -> Self {
        self.field_of_study = Some(field.into());
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = jurisdiction.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Trimmed, lowercased keywords with case-insensitive duplicates and
    /// blanks removed. First occurrence wins, order is preserved.
    pub fn normalized_keywords(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }

    /// Field of study trimmed, `None` when blank.
    pub fn field(&self) -> Option<&str> {
        self.field_of_study
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    /// Jurisdiction code in upper case, defaulting when blank.
    pub fn jurisdiction_code(&self) -> String {
        let code = self.jurisdiction.trim();
        if code.is_empty() {
            default_jurisdiction()
        } else {
            code.to_uppercase()
        }
    }

    pub fn exceeds_keyword_limit(&self) -> bool {
        self.keywords.len() > MAX_KEYWORDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_deduplicated_case_insensitively() {
        let request = SearchRequest::new(["CRISPR", " crispr ", "Gene Editing", "", "gene editing"]);
        assert_eq!(request.normalized_keywords(), vec!["crispr", "gene editing"]);
    }

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let request: SearchRequest = serde_json::from_str(r#"{"keywords": ["lidar"]}"#).unwrap();
        assert_eq!(request.jurisdiction, "US");
        assert_eq!(request.limit, 25);
        assert!(request.field().is_none());
    }

    #[test]
    fn test_validation_bounds() {
        assert!(SearchRequest::new(Vec::<String>::new()).validate().is_err());
        assert!(SearchRequest::new(["a"]).with_limit(0).validate().is_err());

        let eleven: Vec<String> = (0..11).map(|i| format!("kw{i}")).collect();
        let request = SearchRequest::new(eleven);
        assert!(request.exceeds_keyword_limit());
        assert!(request.validate().is_err());

        assert!(SearchRequest::new(["a"]).validate().is_ok());
    }

    #[test]
    fn test_blank_field_and_jurisdiction() {
        let request = SearchRequest::new(["a"])
            .with_field_of_study("   ")
            .with_jurisdiction(" ep ");
        assert!(request.field().is_none());
        assert_eq!(request.jurisdiction_code(), "EP");
    }
}
