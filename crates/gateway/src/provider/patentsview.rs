//! PatentsView client
//!
//! Translates a [`ProviderQuery`] into the PatentsView query language:
//! - keyword clauses become an `_or` of `_text_any` matches on
//!   `patent_title` and `patent_abstract`
//! - a mapped field of study adds an `_or` of `_begins` CPC filters
//! - an unmapped field of study adds a free-text clause
//! - the result limit becomes `o.per_page`
//!
//! Transport errors, 429 and 5xx responses are retried with exponential
//! backoff until the configured budget runs out.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use fto_common::config::ProviderConfig;
use fto_common::errors::{AppError, Result};
use fto_risk::{ProviderQuery, SearchField, SecondaryFilter};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::warn;

use super::{PatentProvider, ProviderPage};

/// PatentsView indexes US grants only
const SUPPORTED_JURISDICTION: &str = "US";

const RESPONSE_FIELDS: &[&str] = &[
    "patent_number",
    "patent_title",
    "patent_abstract",
    "patent_date",
    "app_date",
    "assignee_organization",
    "inventor_first_name",
    "inventor_last_name",
    "cpc_subgroup_id",
];

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct PatentsViewResponse {
    #[serde(default)]
    patents: Option<Vec<Value>>,
    #[serde(default)]
    total_patent_count: Option<u64>,
}

impl From<PatentsViewResponse> for ProviderPage {
    fn from(response: PatentsViewResponse) -> Self {
        let records = response.patents.unwrap_or_default();
        let total_matched = response
            .total_patent_count
            .unwrap_or(records.len() as u64);

        ProviderPage { records, total_matched }
    }
}

/// PatentsView HTTP client
pub struct PatentsViewProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    retry_budget: Duration,
}

impl PatentsViewProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            timeout,
            retry_budget: Duration::from_secs(config.retry_budget_secs),
        })
    }

    /// PatentsView query body for a provider query
    pub fn request_body(query: &ProviderQuery) -> Value {
        let keywords: Vec<Value> = query
            .any_of
            .iter()
            .map(|clause| {
                let field = match clause.field {
                    SearchField::Title => "patent_title",
                    SearchField::Abstract => "patent_abstract",
                };
                operator("_text_any", field, clause.term.as_str())
            })
            .collect();

        let q = match &query.secondary {
            None => json!({ "_or": keywords }),
            Some(secondary) => json!({ "_and": [{ "_or": keywords }, secondary_clause(secondary)] }),
        };

        json!({
            "q": q,
            "f": RESPONSE_FIELDS,
            "o": { "per_page": query.limit },
        })
    }

    async fn post(&self, body: &Value) -> std::result::Result<ProviderPage, backoff::Error<AppError>> {
        let mut request = self.client.post(&self.base_url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(status = status.as_u16(), "PatentsView request failed, will retry");
            return Err(backoff::Error::transient(AppError::ProviderFailure {
                message: format!("PatentsView returned {}", status),
            }));
        }

        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            text.truncate(floor_char_boundary(&text, MAX_ERROR_BODY));
            return Err(backoff::Error::permanent(AppError::ProviderFailure {
                message: format!("PatentsView returned {}: {}", status, text),
            }));
        }

        let parsed: PatentsViewResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::ProviderFailure {
                message: format!("invalid PatentsView response: {}", e),
            })
        })?;

        Ok(parsed.into())
    }

    fn transport_error(&self, e: reqwest::Error) -> backoff::Error<AppError> {
        if e.is_timeout() {
            backoff::Error::transient(AppError::ProviderTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })
        } else if e.is_connect() || e.is_request() {
            backoff::Error::transient(AppError::HttpClient(e))
        } else {
            backoff::Error::permanent(AppError::HttpClient(e))
        }
    }
}

#[async_trait]
impl PatentProvider for PatentsViewProvider {
    async fn search(&self, query: &ProviderQuery) -> Result<ProviderPage> {
        if query.jurisdiction != SUPPORTED_JURISDICTION {
            return Err(AppError::ProviderFailure {
                message: format!(
                    "PatentsView covers {} patents only, not {}",
                    SUPPORTED_JURISDICTION, query.jurisdiction
                ),
            });
        }

        let body = Self::request_body(query);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(Some(self.retry_budget))
            .build();

        backoff::future::retry(policy, || self.post(&body)).await
    }

    fn name(&self) -> &str {
        "patentsview"
    }
}

fn secondary_clause(secondary: &SecondaryFilter) -> Value {
    match secondary {
        SecondaryFilter::CpcPrefixes { prefixes, .. } => {
            let begins: Vec<Value> = prefixes
                .iter()
                .map(|prefix| operator("_begins", "cpc_subgroup_id", prefix.as_str()))
                .collect();
            json!({ "_or": begins })
        }
        SecondaryFilter::Term { term, .. } => json!({
            "_or": [
                operator("_text_any", "patent_title", term.as_str()),
                operator("_text_any", "patent_abstract", term.as_str()),
            ]
        }),
    }
}

/// `{op: {field: value}}`
fn operator(op: &str, field: &str, value: impl Into<Value>) -> Value {
    let mut inner = Map::new();
    inner.insert(field.to_string(), value.into());

    let mut outer = Map::new();
    outer.insert(op.to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
    if text.len() <= max {
        return text.len();
    }
    (0..=max).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0)
}
