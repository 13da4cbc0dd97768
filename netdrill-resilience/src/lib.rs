//! Concurrency and resilience patterns for netdrill
//!
//! This crate provides the fan-out primitive used by every batch action,
//! the key-exclusive wave partitioning used when funding, and retries that
//! rotate over a set of daemon endpoints.

pub mod exclusive;
pub mod fanout;
pub mod retry;
pub mod rotation;

// Re-export commonly used types
pub use exclusive::partition_waves;
pub use fanout::launch_all;
pub use retry::Retryable;
pub use rotation::EndpointRotation;
