//! Experiment lifecycle storage for netdrill
//!
//! A single-slot [`ExperimentStore`] tracks the one experiment a process may
//! run at a time. Every mutation is mirrored to an [`ExperimentRepository`];
//! the in-memory slot stays authoritative when mirroring fails.

pub mod error;
pub mod repository;
pub mod state;
pub mod store;

pub use error::{StorageError, StorageResult, StoreError};
pub use repository::{ExperimentRepository, FileExperimentRepository, InMemoryExperimentRepository};
pub use state::{ExperimentState, ExperimentStatus};
pub use store::ExperimentStore;
