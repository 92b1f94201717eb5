//! Execution contract between the dispatcher and a storage backend

use crate::descriptor::QueryDescriptor;

/// Identifier of a stored entity
pub type EntityId = u64;

/// Failures reported by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The backend rejected or failed to run the query
    #[error("Query failed: {0}")]
    Query(String),

    /// Stored data the backend could not interpret
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Storage could not be reached or loaded
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Runs descriptors against a store
pub trait QueryExecutor {
    /// Ids matching `descriptor`, ordered and windowed
    fn execute(&self, descriptor: &QueryDescriptor) -> Result<Vec<EntityId>, ExecutionError>;

    /// Number of records matching the filters of `descriptor`, ignoring its
    /// range and ordering
    fn count(&self, descriptor: &QueryDescriptor) -> Result<u64, ExecutionError>;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for &T {
    fn execute(&self, descriptor: &QueryDescriptor) -> Result<Vec<EntityId>, ExecutionError> {
        (**self).execute(descriptor)
    }

    fn count(&self, descriptor: &QueryDescriptor) -> Result<u64, ExecutionError> {
        (**self).count(descriptor)
    }
}
