//! Daemon control configuration
//!
//! Describes how the execution engine reaches the nodes under test: the
//! daemon CLI used for funding, the control script used for restarts, the
//! online-status service used for discovery and the funding daemon ports.

use crate::error::ConfigResult;
use crate::validation::{
    validate_port, validate_positive, validate_required_string, validate_url, Validatable,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executable used when `daemon_exec` is not configured
pub const DEFAULT_DAEMON_EXEC: &str = "mina";

/// Daemon control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Local daemon ports funding commands may be sent through
    #[serde(default)]
    pub fund_daemon_ports: Vec<String>,

    /// Path of the daemon executable, falls back to `mina` on PATH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_exec: Option<String>,

    /// Script invoked as `<control_exec> restart|restart-clean <node>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_exec: Option<String>,

    /// Online-status service queried by `discovery`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_url: Option<String>,

    /// GraphQL port appended to node addresses that carry none
    #[serde(default = "default_graphql_port")]
    pub graphql_port: u16,

    /// Slot duration of the network under test
    #[serde(default = "default_slot_duration_ms")]
    pub slot_duration_ms: u64,

    /// Genesis timestamp of the network under test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_timestamp: Option<DateTime<Utc>>,

    /// Delay passed to nodes when they are asked to stop
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_stop_daemon_delay")]
    pub stop_daemon_delay: Duration,

    /// Timeout of a single request to a node or the status service
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Log every request sent to a node at debug level
    #[serde(default = "crate::domains::utils::default_false")]
    pub print_requests: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            fund_daemon_ports: Vec::new(),
            daemon_exec: None,
            control_exec: None,
            online_url: None,
            graphql_port: default_graphql_port(),
            slot_duration_ms: default_slot_duration_ms(),
            genesis_timestamp: None,
            stop_daemon_delay: default_stop_daemon_delay(),
            request_timeout: default_request_timeout(),
            print_requests: false,
        }
    }
}

impl DaemonConfig {
    /// Daemon executable to invoke, and whether it is the built-in fallback
    pub fn daemon_executable(&self) -> (&str, bool) {
        match self.daemon_exec.as_deref() {
            Some(exec) => (exec, false),
            None => (DEFAULT_DAEMON_EXEC, true),
        }
    }

    /// Parsed funding daemon ports
    pub fn fund_ports(&self) -> Vec<u16> {
        self.fund_daemon_ports
            .iter()
            .filter_map(|port| port.parse().ok())
            .collect()
    }
}

impl Validatable for DaemonConfig {
    fn validate(&self) -> ConfigResult<()> {
        for port in &self.fund_daemon_ports {
            validate_port(port, "fund_daemon_ports", self.domain_name())?;
        }

        if let Some(ref exec) = self.daemon_exec {
            validate_required_string(exec, "daemon_exec", self.domain_name())?;
        }

        if let Some(ref exec) = self.control_exec {
            validate_required_string(exec, "control_exec", self.domain_name())?;
        }

        if let Some(ref url) = self.online_url {
            validate_url(url, "online_url", self.domain_name())?;
        }

        validate_positive(self.graphql_port, "graphql_port", self.domain_name())?;
        validate_positive(self.slot_duration_ms, "slot_duration_ms", self.domain_name())?;
        validate_positive(
            self.request_timeout.as_secs(),
            "request_timeout",
            self.domain_name(),
        )?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "daemon"
    }
}

// Default value functions
fn default_graphql_port() -> u16 {
    3085
}

fn default_slot_duration_ms() -> u64 {
    180_000
}

fn default_stop_daemon_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}
