//! Provider query construction
//!
//! Builds a provider-agnostic query from a [`SearchRequest`]. The output is
//! plain data so provider clients can translate it into their own wire
//! format and tests can compare shapes directly.

use fto_common::config::ScoringConfig;
use fto_common::errors::{AppError, Result};
use fto_common::models::SearchRequest;
use fto_common::MAX_KEYWORDS;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Text field a keyword clause applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Abstract,
}

/// One case-insensitive term match on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermClause {
    pub field: SearchField,
    pub term: String,
}

/// Narrowing filter derived from the field of study
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecondaryFilter {
    /// Field maps through the taxonomy: match any CPC prefix
    CpcPrefixes { field_of_study: String, prefixes: Vec<String> },
    /// Unmapped field: match the field name as free text
    Term { field_of_study: String, term: String },
}

/// Structured search request handed to a provider client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderQuery {
    /// Disjunction of keyword clauses over title and abstract
    pub any_of: Vec<TermClause>,
    /// Required jurisdiction (equality)
    pub jurisdiction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondaryFilter>,
    pub limit: usize,
}

impl ProviderQuery {
    /// Distinct keyword terms in clause order
    pub fn terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = Vec::new();
        for clause in &self.any_of {
            if !terms.contains(&clause.term.as_str()) {
                terms.push(&clause.term);
            }
        }
        terms
    }
}

/// Query builder
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    config: Arc<ScoringConfig>,
}

impl QueryBuilder {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    /// Build the provider query, rejecting unusable requests.
    pub fn build(&self, request: &SearchRequest) -> Result<ProviderQuery> {
        let keywords = Self::validated_keywords(request)?;

        if request.limit == 0 {
            return Err(AppError::InvalidRequest {
                message: "result limit must be greater than zero".to_string(),
            });
        }

        let any_of = keywords
            .iter()
            .flat_map(|term| {
                [SearchField::Title, SearchField::Abstract]
                    .into_iter()
                    .map(move |field| TermClause {
                        field,
                        term: term.clone(),
                    })
            })
            .collect();

        let secondary = request.field().map(|field| {
            let field_of_study = field.to_lowercase();
            match self.config.prefixes_for(field) {
                Some(prefixes) => SecondaryFilter::CpcPrefixes {
                    field_of_study,
                    prefixes: prefixes.to_vec(),
                },
                None => SecondaryFilter::Term {
                    term: field_of_study.clone(),
                    field_of_study,
                },
            }
        });

        Ok(ProviderQuery {
            any_of,
            jurisdiction: request.jurisdiction_code(),
            secondary,
            limit: request.limit,
        })
    }

    /// Normalized keywords, or `InvalidRequest` when none survive or too many
    /// were supplied.
    pub fn validated_keywords(request: &SearchRequest) -> Result<Vec<String>> {
        if request.exceeds_keyword_limit() {
            return Err(AppError::InvalidRequest {
                message: format!(
                    "at most {} keywords are allowed, got {}",
                    MAX_KEYWORDS,
                    request.keywords.len()
                ),
            });
        }

        let keywords = request.normalized_keywords();
        if keywords.is_empty() {
            return Err(AppError::InvalidRequest {
                message: "at least one non-blank keyword is required".to_string(),
            });
        }

        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(Arc::new(ScoringConfig::default()))
    }

    #[test]
    fn test_keyword_clauses_cover_title_and_abstract() {
        let request = SearchRequest::new(["CRISPR", "crispr", "Gene Editing"]);
        let query = builder().build(&request).unwrap();

        assert_eq!(query.terms(), vec!["crispr", "gene editing"]);
        assert_eq!(query.any_of.len(), 4);
        assert_eq!(
            query.any_of[0],
            TermClause { field: SearchField::Title, term: "crispr".into() }
        );
        assert_eq!(
            query.any_of[1],
            TermClause { field: SearchField::Abstract, term: "crispr".into() }
        );
        assert_eq!(query.jurisdiction, "US");
        assert_eq!(query.limit, 25);
        assert!(query.secondary.is_none());
    }

    #[test]
    fn test_mapped_field_yields_cpc_filter() {
        let request = SearchRequest::new(["lidar"])
            .with_field_of_study("Software")
            .with_jurisdiction("ep")
            .with_limit(5);
        let query = builder().build(&request).unwrap();

        assert_eq!(query.jurisdiction, "EP");
        assert_eq!(query.limit, 5);
        match query.secondary {
            Some(SecondaryFilter::CpcPrefixes { field_of_study, prefixes }) => {
                assert_eq!(field_of_study, "software");
                assert_eq!(prefixes, vec!["G06F", "G06N", "H04L", "G06Q"]);
            }
            other => panic!("unexpected filter: {other:?}"),
        }
    }

    #[test]
    fn test_unmapped_field_yields_term_filter() {
        let request = SearchRequest::new(["glaze"]).with_field_of_study("Ceramics");
        let query = builder().build(&request).unwrap();
        assert_eq!(
            query.secondary,
            Some(SecondaryFilter::Term {
                field_of_study: "ceramics".into(),
                term: "ceramics".into(),
            })
        );
    }

    #[test]
    fn test_blank_keywords_rejected() {
        let err = builder().build(&SearchRequest::new(["  ", ""])).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest { .. }));
    }

    #[test]
    fn test_over_limit_keywords_rejected() {
        let keywords: Vec<String> = (0..11).map(|i| format!("term{i}")).collect();
        let err = builder().build(&SearchRequest::new(keywords)).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest { .. }));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = builder()
            .build(&SearchRequest::new(["a"]).with_limit(0))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest { .. }));
    }

    #[test]
    fn test_query_serializes_with_tagged_filter() {
        let request = SearchRequest::new(["enzyme"]).with_field_of_study("biotechnology");
        let json = serde_json::to_value(builder().build(&request).unwrap()).unwrap();
        assert_eq!(json["secondary"]["kind"], "cpc_prefixes");
        assert_eq!(json["any_of"][0]["field"], "title");
    }
}
