//! Resumable generators and the pull-based iterator protocol for Strand.
//!
//! This crate drives coroutine bodies through the suspend/resume protocol
//! and exposes them as iterators:
//!
//! - **Iterator contract**: [`Resumable`], implemented by plain sequences,
//!   generators and boxed or borrowed handles
//! - **Generators**: [`Generator`] runs a [`Routine`] (an explicit state
//!   machine) with input injection, error injection, forced return and
//!   `yield*` delegation
//! - **Fibers**: [`Fiber`] lets a body be written as straight-line code on
//!   its own thread
//! - **Consumer loop**: [`for_each`], [`ForOf`] and [`spread`], which close
//!   the handle when the loop is left early
//! - **Drivers**: [`run`] and [`Scheduler`] treat yielded values as requests
//!   and feed the answers back in
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              Consumer (for_each / ForOf / run)         │
//! └───────────────────────────┬────────────────────────────┘
//!                             │ advance / inject_error / force_return
//! ┌───────────────────────────▼────────────────────────────┐
//! │                   Resumable (contract)                 │
//! ├──────────────────┬─────────────────────────────────────┤
//! │  Sequence<I>     │  Generator                          │
//! │  (Rust Iterator) │  ┌────────────────┐ ┌─────────────┐ │
//! │                  │  │ GeneratorHeader│ │ delegate    │ │
//! │                  │  │ state + index  │ │ (yield*)    │ │
//! │                  │  └────────────────┘ └─────────────┘ │
//! │                  │  ┌────────────────────────────────┐ │
//! │                  │  │ Routine: state machine | Fiber │ │
//! │                  │  └────────────────────────────────┘ │
//! └──────────────────┴─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use strand_vm::{Generator, Step, Suspend};
//!
//! // function* g() { yield 'hello'; yield 'world'; return 'ending' }
//! let mut pc = 0;
//! let g: Generator<'_, &str, ()> = Generator::from_fn(move |resume| {
//!     resume.into_input()?;
//!     pc += 1;
//!     Ok(match pc {
//!         1 => Suspend::Yield("hello"),
//!         2 => Suspend::Yield("world"),
//!         _ => Suspend::Complete(Some("ending")),
//!     })
//! });
//!
//! assert_eq!(g.next(), Ok(Step::yielded("hello")));
//! assert_eq!(g.next(), Ok(Step::yielded("world")));
//! assert_eq!(g.next(), Ok(Step::complete(Some("ending"))));
//! assert_eq!(g.next(), Ok(Step::exhausted()));
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

// Protocol
pub mod iterator;
pub mod signal;

// Bodies
pub mod fiber;
pub mod routine;

// Engine
pub mod config;
pub mod generator;

// Consumers
pub mod consumer;
pub mod driver;

// Re-exports
pub use config::GeneratorConfig;
pub use consumer::{ForOf, LoopExit, close, for_each, for_of, spread};
pub use driver::{Scheduler, TaskId, TaskOutcome, TaskResult, run};
pub use fiber::{Co, Fiber, FiberResult};
pub use generator::Generator;
pub use iterator::{Resumable, Sequence, sequence_from_fn};
pub use routine::{ContextRoutine, FnRoutine, Routine, RoutineResult, from_fn, with_context};
pub use signal::{Abrupt, Resume, Suspend};
pub use strand_core::{GeneratorError, GeneratorState, InvalidState, Step, StepResult};
