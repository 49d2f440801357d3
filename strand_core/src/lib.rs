//! # Strand Core
//!
//! Shared vocabulary for the Strand iterator/generator engine.
//!
//! This crate provides the small set of types every other Strand component
//! speaks in terms of:
//!
//! - **Step**: the `(value, done)` pair produced by one advancement
//! - **State**: the generator lifecycle and its packed header
//! - **Error Handling**: protocol and propagation errors

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod state;
pub mod step;

pub use error::{GeneratorError, InvalidState, StepResult};
pub use state::{GeneratorHeader, GeneratorState};
pub use step::Step;

/// Strand version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
