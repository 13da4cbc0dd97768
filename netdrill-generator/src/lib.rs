//! Experiment generation for netdrill
//!
//! Turns a handful of experiment-level parameters into a causally ordered
//! script: every round discovers nodes, picks senders, loads keys, schedules
//! traffic and stops a sample of nodes at random times. Commands refer to
//! the outputs of earlier commands through relative [`Reference`]s.
//!
//! Randomness is always injected, so a seeded RNG reproduces a script exactly.
//!
//! [`Reference`]: netdrill_core::Reference

pub mod encode;
pub mod error;
pub mod format;
pub mod params;
pub mod requirements;
pub mod round;
pub mod sampling;
pub mod validation;

pub use encode::{encode, JsonLinesWriter, ScriptBuffer, ScriptWriter};
pub use error::GenerateError;
pub use params::{GenParams, GeneratorInput};
pub use round::{generate, GeneratedRound};
pub use sampling::{sample_stop_ratio, sample_tps};
pub use validation::{validate_all, validate_first, ValidationCode, ValidationFailure};
