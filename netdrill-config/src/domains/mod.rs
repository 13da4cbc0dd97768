//! Domain-specific configuration modules

pub mod daemon;
pub mod logging;
pub mod storage;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main netdrill configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NetdrillConfig {
    /// Daemon control surface used while executing a script
    #[serde(default)]
    pub daemon: daemon::DaemonConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Experiment state persistence
    #[serde(default)]
    pub storage: storage::StorageConfig,
}

impl NetdrillConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.daemon.validate()?;
        self.logging.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}
