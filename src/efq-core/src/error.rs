//! Errors surfaced by the dispatcher

use efq_query::{BuildError, ExecutionError};

use crate::render::RenderError;

/// Result type for dispatcher operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failures that cannot be expressed as a placeholder response
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The builder could not handle the request
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The storage backend failed
    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// Records could not be rendered
    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
}
