//! Observation records for step outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A non-sensitive step output, published for external consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub name: String,
    pub multi: bool,
    pub value: Value,
    pub step: usize,
    pub time: DateTime<Utc>,
}

impl OutputRecord {
    pub fn new(step: usize, name: impl Into<String>, value: Value, multi: bool) -> Self {
        Self {
            name: name.into(),
            multi,
            value,
            step,
            time: Utc::now(),
        }
    }
}
