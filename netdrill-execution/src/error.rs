//! Error types for script execution

use netdrill_core::ModelError;
use netdrill_resilience::Retryable;
use thiserror::Error;

/// Reference resolution failures
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no output {name} at step {target} (referenced from step {step})")]
    UnresolvedReference {
        step: usize,
        target: usize,
        name: String,
    },

    /// Offsets must point strictly backwards
    #[error("reference from step {step} with offset {offset} does not point backwards")]
    ForwardReference { step: usize, offset: i64 },

    #[error("reference from step {step} with offset {offset} reaches before the first step")]
    BeforeStart { step: usize, offset: i64 },

    #[error("malformed reference in step {step}: {source}")]
    Malformed {
        step: usize,
        #[source]
        source: ModelError,
    },
}

/// Failures writing a step output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Error marshalling value {name} for step {step}: {source}")]
    Serialization {
        name: String,
        step: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Error outputting multiple values for {name} on step {step}")]
    Duplicate { name: String, step: usize },

    #[error("Error writing output {name} for step {step}: {source}")]
    Sink {
        name: String,
        step: usize,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    pub fn code(&self) -> i32 {
        match self {
            OutputError::Serialization { .. } => 7,
            OutputError::Duplicate { .. } | OutputError::Sink { .. } => 8,
        }
    }
}

/// Failures of a single action
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid parameters: {0}")]
    Params(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("process failed: {0}")]
    Process(String),

    #[error("node request failed: {0}")]
    Node(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("cancelled")]
    Cancelled,
}

impl Retryable for ActionError {
    fn is_retryable(&self) -> bool {
        match self {
            ActionError::Process(_) | ActionError::Node(_) => true,
            ActionError::Io(e) => e.is_retryable(),
            ActionError::Params(_)
            | ActionError::InvalidInput(_)
            | ActionError::Output(_)
            | ActionError::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for ActionError {
    fn from(err: reqwest::Error) -> Self {
        ActionError::Node(err.to_string())
    }
}

/// Fatal engine errors; any of these aborts the run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Error validating action '{action}' for step {step}: {source}")]
    Validation {
        action: String,
        step: usize,
        #[source]
        source: ActionError,
    },

    #[error("Error decoding command for step {step}: {source}")]
    Decode {
        step: usize,
        #[source]
        source: ModelError,
    },

    #[error("Error reading script at step {step}: {source}")]
    Io {
        step: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Error resolving params for step {step}: {source}")]
    Resolve {
        step: usize,
        #[source]
        source: ResolveError,
    },

    #[error("Unknown action name: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Output(OutputError),

    #[error("Error running steps {start}-{end}: {source}")]
    StepFailed {
        start: usize,
        end: usize,
        #[source]
        source: ActionError,
    },

    #[error("Experiment cancelled")]
    Cancelled,
}

impl EngineError {
    /// Stable numeric code per error category
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Validation { .. } => 1,
            EngineError::Decode { .. } | EngineError::Io { .. } => 5,
            EngineError::Resolve { .. } => 6,
            EngineError::Output(e) => e.code(),
            EngineError::StepFailed { .. } => 9,
            EngineError::UnknownAction(_) => 10,
            EngineError::Cancelled => 130,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_never_rotates() {
        assert!(!ActionError::Cancelled.is_retryable());
        assert!(!ActionError::InvalidInput("x".into()).is_retryable());
        assert!(ActionError::Process("exit 1".into()).is_retryable());
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "mina");
        assert!(!ActionError::Io(missing).is_retryable());
    }

    #[test]
    fn test_engine_codes() {
        assert_eq!(EngineError::UnknownAction("x".into()).code(), 10);
        let failed = EngineError::StepFailed {
            start: 3,
            end: 5,
            source: ActionError::Process("exit 1".into()),
        };
        assert_eq!(failed.code(), 9);
        assert_eq!(
            failed.to_string(),
            "Error running steps 3-5: process failed: exit 1"
        );
        let duplicate = EngineError::Output(OutputError::Duplicate {
            name: "key".into(),
            step: 2,
        });
        assert_eq!(duplicate.code(), 8);
    }
}
