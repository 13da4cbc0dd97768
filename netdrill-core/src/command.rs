//! Script commands and the newline-delimited entry format

use crate::action::ActionTag;
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One script step: an action tag and its parameter payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Action tag the engine dispatches on
    pub action: String,

    /// Parameter payload, possibly holding output references
    #[serde(default)]
    pub params: Value,

    /// Informational comment, written as a separate line before the command
    #[serde(skip)]
    pub comment: Option<String>,
}

impl Command {
    /// Create a command for a known action
    pub fn new(action: ActionTag, params: Value) -> Self {
        Self {
            action: action.as_str().to_string(),
            params,
            comment: None,
        }
    }

    /// Attach a comment to the command
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Parse the action tag, if it belongs to the vocabulary
    pub fn tag(&self) -> Option<ActionTag> {
        self.action.parse().ok()
    }
}

/// A line of a script: either a comment or a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptEntry {
    Comment(String),
    Command(Command),
}

impl ScriptEntry {
    /// Decode a single script line
    pub fn from_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        match value {
            Value::String(comment) => Ok(ScriptEntry::Comment(comment)),
            Value::Object(ref map) if map.contains_key("action") => {
                Ok(ScriptEntry::Command(serde_json::from_value(value)?))
            }
            other => Err(ModelError::InvalidEntry(format!(
                "expected a comment string or a command object, got {}",
                other
            ))),
        }
    }

    /// Encode the entry as a single line without trailing newline
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
