//! Script execution for netdrill
//!
//! The [`Engine`] walks a newline-delimited script one entry at a time. Each
//! command's payload is resolved against the outputs of earlier steps, then
//! dispatched to the [`Action`] registered under its tag. Consecutive
//! commands of a batchable action are collected and run together.
//!
//! [`ExperimentRunner`] wraps one engine run in the lifecycle of an
//! experiment recorded in an [`ExperimentStore`](netdrill_storage::ExperimentStore).

pub mod action;
pub mod actions;
pub mod cache;
pub mod engine;
pub mod error;
pub mod node;
pub mod registry;
pub mod resolve;
pub mod runner;
pub mod sink;

pub use action::{Action, ActionContext, ActionIO};
pub use cache::{CacheEntry, OutputCache, StepOutput};
pub use engine::{Engine, EngineListener, NoopListener};
pub use error::{ActionError, EngineError, OutputError, ResolveError};
pub use node::{HttpNodeControl, NodeControl, TransferRequest};
pub use registry::ActionRegistry;
pub use resolve::resolve;
pub use runner::{ExperimentRunner, RunError};
pub use sink::{MemorySink, NullSink, OutputSink, StdoutSink};
