//! Coroutine bodies.
//!
//! A [`Routine`] is a coroutine body written as an explicit state machine:
//! it keeps a program-counter-like discriminator over its own suspension
//! points and is called once per resumption.
//!
//! # Regions
//!
//! Handler and cleanup regions are ordinary control flow inside `resume`:
//!
//! ```text
//! match pc {
//!     // try { yield 2 } catch (e) { .. }
//!     AT_2 => match resume {
//!         Resume::Throw(e) => { /* handler */ }
//!         other => { other.into_input()?; }
//!     },
//!     // try { yield 2 } finally { yield 4 }
//!     AT_2 => if let Err(abrupt) = resume.into_input() {
//!         self.pending = Some(abrupt);   // re-raised after the cleanup
//!         self.pc = CLEANUP;
//!         return Ok(Suspend::Yield(4));
//!     },
//! }
//! ```
//!
//! For bodies that read better as straight-line code see [`crate::fiber`].

use crate::signal::{Abrupt, Resume, Suspend};

/// What one resumption of a body produces.
pub type RoutineResult<'a, T, E> = Result<Suspend<'a, T, E>, Abrupt<T, E>>;

/// A resumable coroutine body.
///
/// The engine guarantees `resume` is never called reentrantly, never after
/// the body returned `Complete` or `Err`, and that the first call is always
/// `Resume::Next(None)`.
pub trait Routine<'a, T, E> {
    /// Runs the body from its last suspension point to the next one.
    fn resume(&mut self, resume: Resume<T, E>) -> RoutineResult<'a, T, E>;
}

impl<'a, T, E, R: Routine<'a, T, E> + ?Sized> Routine<'a, T, E> for Box<R> {
    #[inline]
    fn resume(&mut self, resume: Resume<T, E>) -> RoutineResult<'a, T, E> {
        (**self).resume(resume)
    }
}

// ============================================================================
// Closure Routines
// ============================================================================

/// A routine backed by a closure. See [`from_fn`].
pub struct FnRoutine<F> {
    f: F,
}

/// Builds a routine from a closure called once per resumption.
#[inline]
pub fn from_fn<'a, T, E, F>(f: F) -> FnRoutine<F>
where
    F: FnMut(Resume<T, E>) -> RoutineResult<'a, T, E>,
{
    FnRoutine { f }
}

impl<'a, T, E, F> Routine<'a, T, E> for FnRoutine<F>
where
    F: FnMut(Resume<T, E>) -> RoutineResult<'a, T, E>,
{
    #[inline]
    fn resume(&mut self, resume: Resume<T, E>) -> RoutineResult<'a, T, E> {
        (self.f)(resume)
    }
}

/// A routine that threads an explicit context through every resumption.
///
/// This is the replacement for a body that writes to an implicit receiver:
/// the context is owned (or borrowed, `C = &mut X`) by the routine and
/// handed to the closure on each step.
pub struct ContextRoutine<C, F> {
    ctx: C,
    f: F,
}

/// Builds a routine whose closure receives `&mut ctx` on every resumption.
#[inline]
pub fn with_context<'a, C, T, E, F>(ctx: C, f: F) -> ContextRoutine<C, F>
where
    F: FnMut(&mut C, Resume<T, E>) -> RoutineResult<'a, T, E>,
{
    ContextRoutine { ctx, f }
}

impl<C, F> ContextRoutine<C, F> {
    /// Borrows the context.
    #[inline]
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Consumes the routine, returning the context.
    #[inline]
    pub fn into_context(self) -> C {
        self.ctx
    }
}

impl<'a, C, T, E, F> Routine<'a, T, E> for ContextRoutine<C, F>
where
    F: FnMut(&mut C, Resume<T, E>) -> RoutineResult<'a, T, E>,
{
    #[inline]
    fn resume(&mut self, resume: Resume<T, E>) -> RoutineResult<'a, T, E> {
        (self.f)(&mut self.ctx, resume)
    }
}

// ============================================================================
// Tests
// ============================================================================
