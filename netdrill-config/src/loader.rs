//! Configuration loading and environment variable handling

use crate::domains::NetdrillConfig;
use crate::error::{ConfigError, ConfigResult};
use log::debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "NETDRILL".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML or JSON file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<NetdrillConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: NetdrillConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        debug!("Loaded configuration from {}", path.display());

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<NetdrillConfig> {
        let mut config = NetdrillConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<NetdrillConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut NetdrillConfig) -> ConfigResult<()> {
        self.apply_daemon_overrides(&mut config.daemon)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_storage_overrides(&mut config.storage);
        Ok(())
    }

    /// Apply daemon config overrides
    fn apply_daemon_overrides(
        &self,
        config: &mut crate::domains::daemon::DaemonConfig,
    ) -> ConfigResult<()> {
        if let Ok(ports) = self.get_env_var("FUND_DAEMON_PORTS") {
            config.fund_daemon_ports = ports
                .split(',')
                .map(str::trim)
                .filter(|port| !port.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(exec) = self.get_env_var("DAEMON_EXEC") {
            config.daemon_exec = Some(exec);
        }

        if let Ok(exec) = self.get_env_var("CONTROL_EXEC") {
            config.control_exec = Some(exec);
        }

        if let Ok(url) = self.get_env_var("ONLINE_URL") {
            config.online_url = Some(url);
        }

        if let Ok(slot) = self.get_env_var("SLOT_DURATION_MS") {
            config.slot_duration_ms = slot
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SLOT_DURATION_MS: {}", e)))?;
        }

        if let Ok(timeout) = self.get_env_var("REQUEST_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid REQUEST_TIMEOUT: {}", e)))?;
            config.request_timeout = Duration::from_secs(seconds);
        }

        if let Ok(print) = self.get_env_var("PRINT_REQUESTS") {
            config.print_requests = print
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid PRINT_REQUESTS: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        if let Ok(file) = self.get_env_var("LOG_FILE") {
            config.file = Some(PathBuf::from(file));
        }

        Ok(())
    }

    /// Apply storage config overrides
    fn apply_storage_overrides(&self, config: &mut crate::domains::storage::StorageConfig) {
        if let Ok(dir) = self.get_env_var("STATE_DIR") {
            config.state_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
