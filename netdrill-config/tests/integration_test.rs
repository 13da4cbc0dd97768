//! Integration tests for netdrill-config

use netdrill_config::domains::logging::{LogFormat, LogLevel};
use netdrill_config::*;
use std::io::Write;
use std::time::Duration;
use temp_env::{with_vars, with_vars_unset};

const OVERRIDES: [&str; 4] = [
    "NETDRILL_SLOT_DURATION_MS",
    "NETDRILL_LOG_LEVEL",
    "NETDRILL_REQUEST_TIMEOUT",
    "NETDRILL_FUND_DAEMON_PORTS",
];

#[test]
fn test_default_config_validation() {
    let config = NetdrillConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("NETDRILL_FUND_DAEMON_PORTS", Some("8301, 8302")),
        ("NETDRILL_LOG_LEVEL", Some("debug")),
        ("NETDRILL_REQUEST_TIMEOUT", Some("5")),
        ("NETDRILL_ONLINE_URL", Some("https://status.example.org")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.daemon.fund_daemon_ports, vec!["8301", "8302"]);
        assert_eq!(config.daemon.request_timeout, Duration::from_secs(5));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.daemon.online_url.as_deref(),
            Some("https://status.example.org")
        );
    });
}

#[test]
fn test_invalid_env_value() {
    with_vars(vec![("NETDRILL_SLOT_DURATION_MS", Some("soon"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("DRILL_LOG_FORMAT", Some("json"))], || {
        let config = ConfigLoader::with_prefix("DRILL").from_env().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_yaml_file_with_env_override() {
    let yaml = r#"
daemon:
  fund_daemon_ports: ["8301"]
  daemon_exec: /opt/mina/bin/mina
  control_exec: ./control.sh
  slot_duration_ms: 90000
  stop_daemon_delay: 20

logging:
  level: warn
  format: compact

storage:
  state_dir: /var/lib/netdrill
"#;
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(vec![("NETDRILL_LOG_LEVEL", Some("trace"))], || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.daemon.daemon_executable(), ("/opt/mina/bin/mina", false));
        assert_eq!(config.daemon.slot_duration_ms, 90_000);
        assert_eq!(config.daemon.stop_daemon_delay, Duration::from_secs(20));
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.storage.state_dir.is_some());
    });
}

#[test]
fn test_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"daemon": {"graphql_port": 8304}}"#).unwrap();

    with_vars_unset(OVERRIDES, || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();
        assert_eq!(config.daemon.graphql_port, 8304);
    });
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"daemon:\n  slot_duration_ms: 0\n").unwrap();

    with_vars_unset(OVERRIDES, || {
        let result = ConfigLoader::new().from_file(file.path());
        assert!(matches!(result, Err(ConfigError::DomainError { .. })));
    });
}
