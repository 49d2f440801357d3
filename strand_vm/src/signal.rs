//! Resumption vocabulary shared by the engine and coroutine bodies.
//!
//! Three enums describe one round trip through a suspension point:
//!
//! ```text
//!   caller ──advance(v)────────► Resume::Next(v)   ─┐
//!   caller ──inject_error(e)───► Resume::Throw(e)  ─┼─► body.resume(..)
//!   caller ──force_return(v)───► Resume::Return(v) ─┘        │
//!                                                            ▼
//!          Ok(Suspend::Yield | Delegate | Complete)  or  Err(Abrupt)
//! ```
//!
//! `Abrupt` is the value a body propagates with `?` when it does not
//! handle a throw or a forced return, and the value a cleanup region
//! holds on to while it runs before re-raising it.

use std::fmt;

use crate::iterator::Resumable;

// ============================================================================
// Resume
// ============================================================================

/// How a suspended body is being resumed.
pub enum Resume<T, E> {
    /// Continue normally; the payload becomes the value of the suspension
    /// expression. Always `None` on the very first resumption.
    Next(Option<T>),
    /// Raise this error at the suspension point.
    Throw(E),
    /// Terminate early with this value, running cleanup regions on the way.
    Return(Option<T>),
}

impl<T, E> Resume<T, E> {
    /// Splits a resumption into its normal input or an abrupt completion.
    ///
    /// A body with no handler or cleanup region around a suspension point
    /// writes `let input = resume.into_input()?;`.
    #[inline]
    pub fn into_input(self) -> Result<Option<T>, Abrupt<T, E>> {
        match self {
            Self::Next(input) => Ok(input),
            Self::Throw(err) => Err(Abrupt::Throw(err)),
            Self::Return(value) => Err(Abrupt::Return(value)),
        }
    }

    /// Returns true for `Resume::Next`.
    #[inline]
    pub fn is_next(&self) -> bool {
        matches!(self, Self::Next(_))
    }

    /// Returns true for `Resume::Throw`.
    #[inline]
    pub fn is_throw(&self) -> bool {
        matches!(self, Self::Throw(_))
    }

    /// Returns true for `Resume::Return`.
    #[inline]
    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return(_))
    }

    /// Short label for logging.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Next(_) => "next",
            Self::Throw(_) => "throw",
            Self::Return(_) => "return",
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Resume<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(v) => f.debug_tuple("Next").field(v).finish(),
            Self::Throw(e) => f.debug_tuple("Throw").field(e).finish(),
            Self::Return(v) => f.debug_tuple("Return").field(v).finish(),
        }
    }
}

impl<T, E> From<Abrupt<T, E>> for Resume<T, E> {
    #[inline]
    fn from(abrupt: Abrupt<T, E>) -> Self {
        match abrupt {
            Abrupt::Throw(err) => Self::Throw(err),
            Abrupt::Return(value) => Self::Return(value),
        }
    }
}

// ============================================================================
// Abrupt
// ============================================================================

/// An abrupt completion travelling outward through a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abrupt<T, E> {
    /// An error, raised by the body or injected by the caller.
    Throw(E),
    /// A forced return with the requested value.
    Return(Option<T>),
}

impl<T, E> Abrupt<T, E> {
    /// Wraps a body error.
    #[inline]
    pub fn throw(err: E) -> Self {
        Self::Throw(err)
    }

    /// Returns the error if this is a throw.
    #[inline]
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Throw(err) => Some(err),
            Self::Return(_) => None,
        }
    }
}

// ============================================================================
// Suspend
// ============================================================================

/// What a body hands back when it gives up control.
pub enum Suspend<'a, T, E> {
    /// Pause at a suspension point, producing a value.
    Yield(T),
    /// Pause and let `inner` produce values until it is done (`yield*`).
    ///
    /// The inner completion value comes back as `Resume::Next(value)`.
    Delegate(Box<dyn Resumable<T, E> + 'a>),
    /// Finish, optionally with a completion value.
    Complete(Option<T>),
}

impl<'a, T, E> Suspend<'a, T, E> {
    /// Delegates to any handle implementing the iterator contract.
    #[inline]
    pub fn delegate<R>(inner: R) -> Self
    where
        R: Resumable<T, E> + 'a,
    {
        Self::Delegate(Box::new(inner))
    }

    /// Delegates to a plain Rust iterator.
    #[inline]
    pub fn delegate_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
        T: 'a,
        E: 'a,
    {
        Self::delegate(crate::iterator::Sequence::new(iter))
    }

    /// Finishes without a completion value.
    #[inline]
    pub fn done() -> Self {
        Self::Complete(None)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Suspend<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yield(v) => f.debug_tuple("Yield").field(v).finish(),
            Self::Delegate(_) => f.write_str("Delegate(..)"),
            Self::Complete(v) => f.debug_tuple("Complete").field(v).finish(),
        }
    }
}
