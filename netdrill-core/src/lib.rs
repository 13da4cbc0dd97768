//! Core domain model for netdrill
//!
//! This crate defines the language spoken between the script generator and
//! the execution engine: commands, backward output references, the fixed
//! action vocabulary and the parameter payloads each action understands.
//! It has minimal dependencies so both sides can share it.

pub mod action;
pub mod command;
pub mod error;
pub mod output;
pub mod params;
pub mod reference;

// Re-export commonly used types at the crate root
pub use action::ActionTag;
pub use command::{Command, ScriptEntry};
pub use error::{ModelError, Result};
pub use output::OutputRecord;
pub use reference::Reference;
