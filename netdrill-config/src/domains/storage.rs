//! Experiment state persistence configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where experiment records are mirrored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON document per experiment; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Validatable for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref dir) = self.state_dir {
            validate_required_string(&dir.to_string_lossy(), "state_dir", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "storage"
    }
}
