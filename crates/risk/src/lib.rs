//! FTO Navigator Risk Engine
//!
//! Turns raw patent-search hits into a ranked, risk-annotated assessment:
//! - Query building from keywords, field of study and jurisdiction
//! - Normalization of provider payloads into canonical patent records
//! - Four-factor relevance/risk scoring per patent
//! - Stable ranking and aggregation into an overall verdict
//! - Assembly of the result consumed by report rendering
//!
//! Every stage is pure. The only async entry point, [`RiskEngine::analyze`],
//! exists so large batches can be scored on blocking worker threads.

mod aggregate;
mod assemble;
mod engine;
mod normalize;
mod query;
mod recommend;
mod scoring;

pub use aggregate::{rank, Aggregator};
pub use assemble::{Provenance, ResultAssembler};
pub use engine::{PreparedSearch, ProviderOutcome, RiskEngine};
pub use normalize::{NormalizeError, NormalizedBatch, RecordNormalizer};
pub use query::{ProviderQuery, QueryBuilder, SearchField, SecondaryFilter, TermClause};
pub use recommend::recommendations;
pub use scoring::{Factor, RiskScorer, ScoringContext};
