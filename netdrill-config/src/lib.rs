//! Domain-driven configuration management for netdrill
//!
//! Configuration is split by functional domain, each with its own defaults
//! and validation, and can be overridden through `NETDRILL_*` environment
//! variables.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    daemon::DaemonConfig, logging::LoggingConfig, storage::StorageConfig, NetdrillConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
