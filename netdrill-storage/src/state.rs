//! Experiment state record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Registered but not started
    #[default]
    NotRunning,

    Running,

    /// Cancellation requested, run still unwinding
    Cancelling,

    Cancelled,

    Success,

    Error,
}

impl ExperimentStatus {
    /// Whether the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExperimentStatus::Cancelled | ExperimentStatus::Success | ExperimentStatus::Error
        )
    }

    /// Whether a new experiment has to wait for this one
    pub fn is_active(&self) -> bool {
        matches!(self, ExperimentStatus::Running | ExperimentStatus::Cancelling)
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            ExperimentStatus::NotRunning => "not_running",
            ExperimentStatus::Running => "running",
            ExperimentStatus::Cancelling => "cancelling",
            ExperimentStatus::Cancelled => "cancelled",
            ExperimentStatus::Success => "success",
            ExperimentStatus::Error => "error",
        };
        f.write_str(status)
    }
}

/// Everything known about one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentState {
    pub id: Uuid,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: ExperimentStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set exactly once, by the terminal transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(rename = "step")]
    pub current_step_no: usize,

    #[serde(rename = "step_name")]
    pub current_step_name: String,

    #[serde(default)]
    pub logs: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub errors: Vec<String>,

    /// Generation parameters the script was produced from
    #[serde(rename = "setup_json", default)]
    pub setup: Value,
}

impl ExperimentState {
    pub fn new(name: impl Into<String>, setup: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            status: ExperimentStatus::NotRunning,
            created_at: now,
            updated_at: now,
            ended_at: None,
            current_step_no: 0,
            current_step_name: String::new(),
            logs: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            setup,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_classes() {
        assert!(ExperimentStatus::Running.is_active());
        assert!(ExperimentStatus::Cancelling.is_active());
        assert!(!ExperimentStatus::Success.is_active());
        assert!(ExperimentStatus::Cancelled.is_terminal());
        assert!(!ExperimentStatus::NotRunning.is_terminal());
    }

    #[test]
    fn test_state_wire_names() {
        let state = ExperimentState::new("exp-1", json!({"rounds": 2}));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], json!("not_running"));
        assert_eq!(value["step"], json!(0));
        assert_eq!(value["setup_json"]["rounds"], json!(2));
        assert!(value.get("ended_at").is_none());
    }
}
