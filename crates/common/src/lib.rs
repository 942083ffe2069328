//! FTO Navigator Common Library
//!
//! Shared code for the FTO Navigator crates including:
//! - Domain models (search requests, patent records, assessments)
//! - Error types and handling
//! - Configuration management, including the scoring configuration
//! - Analysis persistence abstraction
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::{AppConfig, ScoringConfig};
pub use errors::{AppError, Result};
pub use store::{AnalysisStore, InMemoryAnalysisStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Jurisdiction used when a request does not name one
pub const DEFAULT_JURISDICTION: &str = "US";

/// Default number of provider results requested per analysis
pub const DEFAULT_RESULT_LIMIT: usize = 25;

/// Maximum number of keywords accepted per search request
pub const MAX_KEYWORDS: usize = 10;
