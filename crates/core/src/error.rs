// Error types for project coordination

use crate::validation::ValidationError;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Errors surfaced to callers of the project store and tools
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Adding a name that is already tracked is rejected rather than overwriting.
    #[error("Project already exists: {0}")]
    ProjectExists(String),

    #[error("Invalid arguments provided: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("File system error: {0}")]
    Storage(String),

    #[error("Project store is not running")]
    StoreUnavailable,
}

impl CoordinatorError {
    /// Flatten an `anyhow` chain from the storage layer, keeping every context line.
    pub fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", err))
    }
}
