//! Analysis persistence
//!
//! The risk engine never touches storage. Services persist submissions,
//! status transitions and assembled results through [`AnalysisStore`];
//! the storage technology behind it is interchangeable.

mod memory;

pub use memory::{InMemoryAnalysisStore, DEFAULT_MAX_RECORDS};

use crate::errors::Result;
use crate::models::{AnalysisRecord, AnalysisResult, AnalysisStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage collaborator keyed by analysis id
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Insert a new analysis
    async fn insert(&self, record: AnalysisRecord) -> Result<()>;

    /// Find an analysis by id
    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>>;

    /// Move an analysis to a non-terminal status
    async fn update_status(&self, id: Uuid, status: AnalysisStatus) -> Result<()>;

    /// Store the assembled result and mark the analysis completed
    async fn complete(&self, id: Uuid, result: AnalysisResult) -> Result<()>;

    /// Mark the analysis failed with a reason
    async fn fail(&self, id: Uuid, message: String) -> Result<()>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<()>;
}
