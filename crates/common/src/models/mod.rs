//! Domain models
//!
//! Value types shared by the risk engine, the storage layer and the
//! HTTP gateway. Field names are part of the report contract and are
//! serialized in snake_case.

mod analysis;
mod assessment;
mod patent;
mod request;

pub use analysis::{AnalysisRecord, AnalysisResult, AnalysisStatus, ResearchProfile};
pub use assessment::{OverallAssessment, RiskFactors, RiskLevel, ScoredPatent, NO_PATENTS_FACTOR};
pub use patent::PatentRecord;
pub use request::SearchRequest;
