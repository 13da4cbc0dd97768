//! Core error types

use thiserror::Error;

/// Errors raised while reading or building script entries
#[derive(Debug, Error)]
pub enum ModelError {
    /// Line is valid JSON but neither a comment nor a command
    #[error("Invalid script entry: {0}")]
    InvalidEntry(String),

    /// Action tag is not part of the vocabulary
    #[error("Unknown action tag: {0}")]
    UnknownTag(String),

    /// Object tagged as an output reference without a valid step or name
    #[error("Invalid output reference: {0}")]
    InvalidReference(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the core model
pub type Result<T> = std::result::Result<T, ModelError>;
