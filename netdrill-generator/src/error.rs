//! Generator error types

use thiserror::Error;

/// Errors raised while generating or writing a script
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Script sink failed
    #[error("Failed to write script: {0}")]
    Io(#[from] std::io::Error),
}
