//! Configuration management for FTO Navigator services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The [`ScoringConfig`] section carries the risk weights, thresholds and the
//! field-of-study taxonomy. Changing any of these changes scoring semantics,
//! not just presentation: two analyses run under different scoring configs
//! are not comparable.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Patent search provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Risk scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Background analysis worker configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Analysis store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider kind: patentsview, static
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    /// Query endpoint
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Optional API key sent as `X-Api-Key`
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Total time budget for retries in seconds
    #[serde(default = "default_provider_retry_budget")]
    pub retry_budget_secs: u64,

    /// JSON array of raw records served by the static provider
    pub fixture_path: Option<String>,
}

/// Scoring weights, thresholds and taxonomy used by the risk engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: FactorWeights,

    #[serde(default)]
    pub thresholds: RiskThresholds,

    /// Classification codes considered per record
    #[serde(default = "default_classification_cap")]
    pub classification_cap: usize,

    /// Matching codes needed for a full classification score
    #[serde(default = "default_classification_saturation")]
    pub classification_saturation: usize,

    /// Score used when the field is unmapped or the record has no codes
    #[serde(default = "default_unknown_classification")]
    pub unknown_classification_score: f64,

    /// Number of top patents averaged when the top patent is not HIGH
    #[serde(default = "default_average_window")]
    pub average_window: usize,

    /// Number of ranked patents kept in an assessment
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Batch size from which records are scored on blocking worker threads
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Field of study (lowercase) to CPC code prefixes
    #[serde(default = "default_field_prefixes")]
    pub field_prefixes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FactorWeights {
    #[serde(default = "default_keyword_weight")]
    pub keyword: f64,
    #[serde(default = "default_classification_weight")]
    pub classification: f64,
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
    #[serde(default = "default_applicant_weight")]
    pub applicant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RiskThresholds {
    /// Composite score at or above which a patent is HIGH risk
    #[serde(default = "default_high_threshold")]
    pub high: f64,
    /// Composite score at or above which a patent is MEDIUM risk
    #[serde(default = "default_medium_threshold")]
    pub medium: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Number of analysis tasks running concurrently
    #[serde(default = "default_worker_concurrency")]
    pub concurrency: usize,

    /// Pending jobs accepted before submissions are rejected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Analyses kept in memory; the oldest finished ones are evicted first
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 100 }
fn default_provider_kind() -> String { "patentsview".to_string() }
fn default_provider_url() -> String { "https://api.patentsview.org/patents/query".to_string() }
fn default_provider_timeout() -> u64 { 30 }
fn default_provider_retry_budget() -> u64 { 60 }
fn default_keyword_weight() -> f64 { 0.4 }
fn default_classification_weight() -> f64 { 0.3 }
fn default_recency_weight() -> f64 { 0.2 }
fn default_applicant_weight() -> f64 { 0.1 }
fn default_high_threshold() -> f64 { 0.7 }
fn default_medium_threshold() -> f64 { 0.4 }
fn default_classification_cap() -> usize { 5 }
fn default_classification_saturation() -> usize { 3 }
fn default_unknown_classification() -> f64 { 0.3 }
fn default_average_window() -> usize { 5 }
fn default_top_n() -> usize { 10 }
fn default_parallel_threshold() -> usize { 64 }
fn default_worker_concurrency() -> usize { 4 }
fn default_queue_capacity() -> usize { 64 }
fn default_max_records() -> usize { 10_000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "fto-navigator".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

fn default_field_prefixes() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 6] = [
        ("biotechnology", &["C12", "C07K", "A61K", "C07H"]),
        ("software", &["G06F", "G06N", "H04L", "G06Q"]),
        ("mechanical", &["F16", "B25", "F01", "F02"]),
        ("electrical", &["H01", "H02", "H03", "H04"]),
        ("chemical", &["C07", "C08", "C09", "C01"]),
        ("medical", &["A61", "A62B", "G16H"]),
    ];

    table
        .into_iter()
        .map(|(field, prefixes)| {
            (
                field.to_string(),
                prefixes.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SCORING__THRESHOLDS__HIGH=0.75
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check every section that has cross-field invariants
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;

        if self.worker.concurrency == 0 || self.worker.queue_capacity == 0 {
            return Err(AppError::Configuration {
                message: "worker concurrency and queue capacity must be positive".to_string(),
            });
        }

        if self.store.max_records < self.worker.queue_capacity + self.worker.concurrency {
            return Err(AppError::Configuration {
                message: "store.max_records must cover every queued and running analysis".to_string(),
            });
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get provider request timeout as Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }
}

impl ScoringConfig {
    /// Reject tunings that would break the [0, 1] score range or the
    /// LOW < MEDIUM < HIGH ordering.
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let weights = [w.keyword, w.classification, w.recency, w.applicant];

        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
            return Err(AppError::Configuration {
                message: "scoring weights must be finite and non-negative".to_string(),
            });
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(AppError::Configuration {
                message: format!("scoring weights must sum to 1.0, got {sum:.6}"),
            });
        }

        let t = &self.thresholds;
        if !(t.medium > 0.0 && t.medium < t.high && t.high <= 1.0) {
            return Err(AppError::Configuration {
                message: format!(
                    "risk thresholds must satisfy 0 < medium < high <= 1, got medium={} high={}",
                    t.medium, t.high
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.unknown_classification_score) {
            return Err(AppError::Configuration {
                message: "unknown classification score must lie in [0, 1]".to_string(),
            });
        }

        if self.classification_cap == 0
            || self.classification_saturation == 0
            || self.average_window == 0
            || self.top_n == 0
        {
            return Err(AppError::Configuration {
                message: "classification cap, saturation, average window and top_n must be positive"
                    .to_string(),
            });
        }

        if let Some((field, _)) = self
            .field_prefixes
            .iter()
            .find(|(_, prefixes)| prefixes.iter().any(|p| p.trim().is_empty()))
        {
            return Err(AppError::Configuration {
                message: format!("empty CPC prefix configured for field '{field}'"),
            });
        }

        Ok(())
    }

    /// CPC prefixes for a field of study, matched case-insensitively.
    pub fn prefixes_for(&self, field_of_study: &str) -> Option<&[String]> {
        let key = field_of_study.trim().to_lowercase();
        self.field_prefixes
            .get(&key)
            .map(Vec::as_slice)
            .filter(|prefixes| !prefixes.is_empty())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            base_url: default_provider_url(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
            retry_budget_secs: default_provider_retry_budget(),
            fixture_path: None,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            thresholds: RiskThresholds::default(),
            classification_cap: default_classification_cap(),
            classification_saturation: default_classification_saturation(),
            unknown_classification_score: default_unknown_classification(),
            average_window: default_average_window(),
            top_n: default_top_n(),
            parallel_threshold: default_parallel_threshold(),
            field_prefixes: default_field_prefixes(),
        }
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            keyword: default_keyword_weight(),
            classification: default_classification_weight(),
            recency: default_recency_weight(),
            applicant: default_applicant_weight(),
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: default_high_threshold(),
            medium: default_medium_threshold(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_worker_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.provider.kind, "patentsview");
        assert_eq!(config.store.max_records, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_store_smaller_than_worker_backlog() {
        let mut config = AppConfig::default();
        config.store.max_records = config.worker.queue_capacity;
        assert!(matches!(config.validate(), Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_default_scoring_constants() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.weights.keyword, 0.4);
        assert_eq!(scoring.weights.classification, 0.3);
        assert_eq!(scoring.weights.recency, 0.2);
        assert_eq!(scoring.weights.applicant, 0.1);
        assert_eq!(scoring.thresholds.high, 0.7);
        assert_eq!(scoring.thresholds.medium, 0.4);
        assert_eq!(scoring.top_n, 10);
        assert_eq!(scoring.field_prefixes.len(), 6);
    }

    #[test]
    fn test_prefix_lookup_is_case_insensitive() {
        let scoring = ScoringConfig::default();
        let prefixes = scoring.prefixes_for("  Biotechnology ").unwrap();
        assert!(prefixes.iter().any(|p| p == "C07K"));
        assert!(scoring.prefixes_for("astrology").is_none());
    }

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let mut scoring = ScoringConfig::default();
        scoring.weights.keyword = 0.5;
        let err = scoring.validate().unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut scoring = ScoringConfig::default();
        scoring.thresholds.medium = 0.8;
        assert!(scoring.validate().is_err());
    }

    #[test]
    fn test_partial_scoring_section_keeps_defaults() {
        let scoring: ScoringConfig =
            serde_json::from_str(r#"{"thresholds": {"high": 0.75}}"#).unwrap();
        assert_eq!(scoring.thresholds.high, 0.75);
        assert_eq!(scoring.thresholds.medium, 0.4);
        assert_eq!(scoring.weights, FactorWeights::default());
        assert!(scoring.validate().is_ok());
    }
}
