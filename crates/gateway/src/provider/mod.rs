//! Patent search providers
//!
//! Providers turn a [`ProviderQuery`] into raw JSON hits. They own every
//! network concern (timeouts, retries, authentication) so the risk engine
//! only ever sees a materialized [`ProviderOutcome`].

mod fixture;
mod patentsview;

pub use fixture::StaticProvider;
pub use patentsview::PatentsViewProvider;

use async_trait::async_trait;
use fto_common::config::ProviderConfig;
use fto_common::errors::{AppError, Result};
use fto_common::metrics::record_provider_call;
use fto_risk::{ProviderOutcome, ProviderQuery};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// One page of provider results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderPage {
    pub records: Vec<Value>,
    /// Matches the provider reports in total, may exceed `records.len()`
    pub total_matched: u64,
}

/// Trait for patent search backends
#[async_trait]
pub trait PatentProvider: Send + Sync {
    /// Run a query and return raw records
    async fn search(&self, query: &ProviderQuery) -> Result<ProviderPage>;

    /// Provider name used in logs and metrics
    fn name(&self) -> &str;
}

/// Build the provider selected by configuration
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn PatentProvider>> {
    match config.kind.trim().to_lowercase().as_str() {
        "patentsview" => Ok(Arc::new(PatentsViewProvider::new(config)?)),
        "static" => {
            let provider = match config.fixture_path.as_deref() {
                Some(path) => StaticProvider::from_file(path)?,
                None => StaticProvider::default(),
            };
            Ok(Arc::new(provider))
        }
        other => Err(AppError::Configuration {
            message: format!("unknown provider kind '{}'", other),
        }),
    }
}

/// Call the provider and fold any error into a failed outcome.
pub async fn fetch(provider: &dyn PatentProvider, query: &ProviderQuery) -> ProviderOutcome {
    let start = Instant::now();
    let result = provider.search(query).await;
    let elapsed = start.elapsed();

    record_provider_call(elapsed.as_secs_f64(), provider.name(), result.is_ok());

    match result {
        Ok(page) => {
            tracing::debug!(
                provider = provider.name(),
                records = page.records.len(),
                total_matched = page.total_matched,
                duration_ms = elapsed.as_millis() as u64,
                "Provider search complete"
            );
            ProviderOutcome::Success {
                records: page.records,
                total_matched: page.total_matched,
            }
        }
        Err(e) => {
            tracing::warn!(provider = provider.name(), error = %e, "Provider search failed");
            ProviderOutcome::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fto_common::models::SearchRequest;
    use fto_common::ScoringConfig;
    use fto_risk::QueryBuilder;

    struct FailingProvider;

    #[async_trait]
    impl PatentProvider for FailingProvider {
        async fn search(&self, _query: &ProviderQuery) -> Result<ProviderPage> {
            Err(AppError::ProviderFailure {
                message: "upstream returned 503".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn query() -> ProviderQuery {
        QueryBuilder::new(Arc::new(ScoringConfig::default()))
            .build(&SearchRequest::new(["lidar"]))
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_folds_errors_into_failure() {
        match fetch(&FailingProvider, &query()).await {
            ProviderOutcome::Failure { reason } => assert!(reason.contains("503")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_build_provider_by_kind() {
        let mut config = ProviderConfig::default();
        assert_eq!(build_provider(&config).unwrap().name(), "patentsview");

        config.kind = "Static".to_string();
        assert_eq!(build_provider(&config).unwrap().name(), "static");

        config.kind = "espacenet".to_string();
        assert!(matches!(
            build_provider(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
