//! Error types and result definitions for Strand.
//!
//! Errors fall into two families:
//! - Protocol violations by the caller (`InvalidState`), which never change
//!   the handle's state beyond what the violated operation documents
//! - Errors carried out of a coroutine body (`UnhandledInjected`,
//!   `PropagatedBody`), after which the handle is permanently completed
//!
//! The payload type `E` is whatever the caller's coroutine bodies raise.

use crate::step::Step;
use thiserror::Error;

/// The result of any advancement operation.
pub type StepResult<T, E> = Result<Step<T>, GeneratorError<E>>;

/// Error surfaced by `advance`, `inject_error` or `force_return`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError<E> {
    /// The operation is not legal in the handle's current state.
    #[error("InvalidStateError: {0}")]
    InvalidState(#[from] InvalidState),

    /// An injected error found no enclosing handler region.
    #[error("unhandled injected error: {0}")]
    UnhandledInjected(E),

    /// The body raised an error of its own that it did not handle.
    #[error("uncaught error in generator body: {0}")]
    PropagatedBody(E),
}

impl<E> GeneratorError<E> {
    /// Returns true for protocol violations.
    #[inline]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Returns true if the error came out of the coroutine body.
    #[inline]
    pub fn is_body_error(&self) -> bool {
        matches!(self, Self::UnhandledInjected(_) | Self::PropagatedBody(_))
    }

    /// Returns the body error payload, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::UnhandledInjected(e) | Self::PropagatedBody(e) => Some(e),
            Self::InvalidState(_) => None,
        }
    }

    /// Borrows the body error payload, if any.
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::UnhandledInjected(e) | Self::PropagatedBody(e) => Some(e),
            Self::InvalidState(_) => None,
        }
    }

    /// Maps the body error payload.
    pub fn map<F, G: FnOnce(E) -> F>(self, f: G) -> GeneratorError<F> {
        match self {
            Self::InvalidState(s) => GeneratorError::InvalidState(s),
            Self::UnhandledInjected(e) => GeneratorError::UnhandledInjected(f(e)),
            Self::PropagatedBody(e) => GeneratorError::PropagatedBody(f(e)),
        }
    }
}

/// Ways an operation can be illegal for a handle's current state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidState {
    /// The handle is already running its body.
    #[error("generator already executing")]
    AlreadyExecuting,

    /// A strict generator was given an input before its first suspension.
    #[error("can't send a value to a just-started generator")]
    InputBeforeStart,

    /// `inject_error` was called on a completed handle.
    #[error("cannot inject an error into a completed generator")]
    InjectAfterCompletion,

    /// `inject_error` was called on an exhausted plain sequence.
    #[error("cannot inject an error into a closed sequence")]
    SequenceClosed,
}
