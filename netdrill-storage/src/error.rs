//! Storage error types

use thiserror::Error;

/// Result type for repository operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Repository errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Name unusable as a storage key
    #[error("Invalid experiment name: {0}")]
    InvalidName(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle transition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("an experiment is already running: {0}")]
    AlreadyRunning(String),

    #[error("no experiment running")]
    NoExperiment,
}
