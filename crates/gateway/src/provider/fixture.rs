//! Provider backed by a fixed record set

use async_trait::async_trait;
use fto_common::errors::{AppError, Result};
use fto_risk::{ProviderQuery, SecondaryFilter};
use serde_json::Value;

use super::{PatentProvider, ProviderPage};

const TEXT_FIELDS: &[&str] = &["title", "patent_title", "abstract", "patent_abstract"];
const JURISDICTION_FIELDS: &[&str] = &["jurisdiction", "country", "patent_country"];
const CLASSIFICATION_FIELDS: &[&str] = &["classifications", "cpc_codes", "cpcs", "cpc"];

/// Serves records from memory, matching keywords against title and abstract.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    records: Vec<Value>,
}

impl StaticProvider {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Load a JSON array of raw records
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("failed to read provider fixture {}: {}", path, e),
        })?;

        let records: Vec<Value> = serde_json::from_str(&contents)?;
        tracing::info!(path, records = records.len(), "Loaded static provider fixture");

        Ok(Self::new(records))
    }

    fn text(record: &Value) -> String {
        TEXT_FIELDS
            .iter()
            .filter_map(|field| record.get(*field).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Records without a jurisdiction field are taken to be in the queried one.
    fn in_jurisdiction(record: &Value, jurisdiction: &str) -> bool {
        JURISDICTION_FIELDS
            .iter()
            .find_map(|field| record.get(*field).and_then(Value::as_str))
            .map_or(true, |code| code.trim().eq_ignore_ascii_case(jurisdiction))
    }

    /// Upper-cased codes, whether listed as strings or as CPC objects
    fn codes(record: &Value) -> Vec<String> {
        let Some(found) = CLASSIFICATION_FIELDS.iter().find_map(|field| record.get(*field)) else {
            return Vec::new();
        };

        let code_of = |item: &Value| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.values().find_map(Value::as_str).map(str::to_string),
            _ => None,
        };

        let raw: Vec<String> = match found {
            Value::Array(items) => items.iter().filter_map(code_of).collect(),
            Value::String(s) => s.split([',', ';']).map(str::to_string).collect(),
            _ => Vec::new(),
        };

        raw.into_iter()
            .map(|code| code.split_whitespace().collect::<String>().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect()
    }

    fn passes_secondary(record: &Value, text: &str, filter: Option<&SecondaryFilter>) -> bool {
        match filter {
            None => true,
            Some(SecondaryFilter::Term { term, .. }) => text.contains(term.as_str()),
            Some(SecondaryFilter::CpcPrefixes { prefixes, .. }) => {
                let codes = Self::codes(record);
                codes.iter().any(|code| {
                    prefixes
                        .iter()
                        .any(|prefix| code.starts_with(&prefix.trim().to_uppercase()))
                })
            }
        }
    }

    fn matches(record: &Value, query: &ProviderQuery, terms: &[&str]) -> bool {
        if !Self::in_jurisdiction(record, &query.jurisdiction) {
            return false;
        }

        let text = Self::text(record);
        terms.iter().any(|term| text.contains(term))
            && Self::passes_secondary(record, &text, query.secondary.as_ref())
    }
}

#[async_trait]
impl PatentProvider for StaticProvider {
    async fn search(&self, query: &ProviderQuery) -> Result<ProviderPage> {
        let terms = query.terms();
        let matched: Vec<&Value> = self
            .records
            .iter()
            .filter(|record| Self::matches(record, query, &terms))
            .collect();

        Ok(ProviderPage {
            total_matched: matched.len() as u64,
            records: matched.into_iter().take(query.limit).cloned().collect(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fto_common::models::SearchRequest;
    use fto_common::ScoringConfig;
    use fto_risk::QueryBuilder;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_matches_title_and_abstract() {
        let provider = StaticProvider::new(vec![
            json!({"id": "US1", "title": "Lidar sensor array"}),
            json!({"id": "US2", "title": "Bicycle", "abstract": "uses LIDAR for braking"}),
            json!({"id": "US3", "title": "Coffee grinder"}),
        ]);
        let query = QueryBuilder::new(Arc::new(ScoringConfig::default()))
            .build(&SearchRequest::new(["lidar"]).with_limit(1))
            .unwrap();

        let page = provider.search(&query).await.unwrap();
        assert_eq!(page.total_matched, 2);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0]["id"], "US1");
    }

    #[tokio::test]
    async fn test_applies_jurisdiction_and_field_filters() {
        let provider = StaticProvider::new(vec![
            json!({"id": "US1", "title": "Lidar sensor array", "country": "US", "cpcs": ["G01S17/89"]}),
            json!({"id": "EP1", "title": "Lidar sensor array", "country": "EP", "cpcs": ["G01S17/89"]}),
            json!({"id": "US2", "title": "Lidar software", "country": "US", "cpcs": [{"cpc_subgroup_id": "G06F16/00"}]}),
            json!({"id": "X3", "title": "Lidar robot arm", "abstract": "for agriculture"}),
        ]);
        let builder = QueryBuilder::new(Arc::new(ScoringConfig::default()));

        async fn ids(provider: &StaticProvider, query: &ProviderQuery) -> Vec<String> {
            let page = provider.search(query).await.unwrap();
            page.records
                .iter()
                .filter_map(|r| r["id"].as_str().map(str::to_string))
                .collect()
        }

        let query = builder.build(&SearchRequest::new(["lidar"])).unwrap();
        assert_eq!(ids(&provider, &query).await, vec!["US1", "US2", "X3"]);

        let query = builder
            .build(&SearchRequest::new(["lidar"]).with_jurisdiction("ep"))
            .unwrap();
        assert_eq!(ids(&provider, &query).await, vec!["EP1", "X3"]);

        let query = builder
            .build(&SearchRequest::new(["lidar"]).with_field_of_study("software"))
            .unwrap();
        assert_eq!(ids(&provider, &query).await, vec!["US2"]);

        let query = builder
            .build(&SearchRequest::new(["lidar"]).with_field_of_study("agriculture"))
            .unwrap();
        assert_eq!(ids(&provider, &query).await, vec!["X3"]);
    }

    #[test]
    fn test_missing_fixture_is_configuration_error() {
        let err = StaticProvider::from_file("/nonexistent/fixture.json").unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
