//! Logging initialisation for netdrill
//!
//! Everything in the workspace logs through `tracing` (or the `log` facade,
//! which `tracing-subscriber` picks up). This crate turns a
//! [`LoggingConfig`](netdrill_config::LoggingConfig) into a global subscriber.

pub mod init;

pub use init::{init_logging, init_simple_tracing, LogGuard};
