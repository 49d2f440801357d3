//! The consumer loop construct.
//!
//! Two shapes of the same loop:
//!
//! - [`for_each`] drives a borrowed handle with a closure that may break
//! - [`ForOf`] owns the handle and is a Rust `Iterator`, so the usual
//!   `for`, `take`, `find` and `?` all work on it
//!
//! Both close the handle when the loop is left before exhaustion, so
//! cleanup regions in the body run. Closing is a single `force_return(None)`.
//! A cleanup region that yields leaves the handle suspended inside it, and
//! the yielded value is discarded.

use std::marker::PhantomData;
use std::ops::ControlFlow;

use strand_core::{GeneratorError, StepResult};
use tracing::{debug, warn};

use crate::generator::Generator;
use crate::iterator::Resumable;

/// How a [`for_each`] loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit<T> {
    /// The handle ran out; carries its completion value, if any.
    Exhausted(Option<T>),
    /// The loop body broke out early and the handle was closed.
    Broken,
}

/// Requests early termination of a handle, running its cleanup regions up
/// to their first suspension.
///
/// Returns the step `force_return` produced. A step with `done == false`
/// means a cleanup region yielded and the handle is still suspended there;
/// it is not resumed again.
pub fn close<T, E, R>(handle: &mut R) -> StepResult<T, E>
where
    R: Resumable<T, E> + ?Sized,
{
    let step = handle.force_return(None)?;
    if !step.done {
        debug!("cleanup yielded while closing; handle left suspended");
    }
    Ok(step)
}

/// Advances `handle` until it is done, passing each value to `body`.
///
/// Non-terminal steps without a value are skipped. An error from the
/// handle aborts the loop and is returned as-is.
pub fn for_each<T, E, R, F>(handle: &mut R, mut body: F) -> Result<LoopExit<T>, GeneratorError<E>>
where
    R: Resumable<T, E> + ?Sized,
    F: FnMut(T) -> ControlFlow<()>,
{
    loop {
        let step = handle.advance(None)?;
        if step.done {
            return Ok(LoopExit::Exhausted(step.value));
        }
        let Some(value) = step.value else {
            continue;
        };
        if body(value).is_break() {
            close(handle)?;
            return Ok(LoopExit::Broken);
        }
    }
}

/// Collects every yielded value, discarding the completion value.
pub fn spread<T, E, R>(handle: &mut R) -> Result<Vec<T>, GeneratorError<E>>
where
    R: Resumable<T, E> + ?Sized,
{
    let mut values = Vec::new();
    loop {
        let step = handle.advance(None)?;
        if step.done {
            return Ok(values);
        }
        values.extend(step.value);
    }
}

// ============================================================================
// ForOf
// ============================================================================

enum LoopState<T> {
    Running,
    Exhausted(Option<T>),
    Failed,
    Closed,
}

/// An owning loop over a handle.
///
/// Yields `Ok(value)` for every value, then `None`. An error is yielded once
/// as `Err` and ends the loop. Dropping the loop before the handle is
/// exhausted closes the handle.
pub struct ForOf<R: Resumable<T, E>, T, E> {
    handle: R,
    state: LoopState<T>,
    _marker: PhantomData<fn() -> E>,
}

/// Starts a loop that owns `handle`.
#[inline]
pub fn for_of<T, E, R: Resumable<T, E>>(handle: R) -> ForOf<R, T, E> {
    ForOf::new(handle)
}

impl<R: Resumable<T, E>, T, E> ForOf<R, T, E> {
    /// Starts a loop that owns `handle`.
    #[inline]
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            state: LoopState::Running,
            _marker: PhantomData,
        }
    }

    /// The completion value, once the handle has been exhausted.
    pub fn completion(&self) -> Option<&T> {
        match &self.state {
            LoopState::Exhausted(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Returns true once the loop will yield nothing more.
    pub fn is_finished(&self) -> bool {
        !matches!(self.state, LoopState::Running)
    }

    /// Leaves the loop early, reporting any error the cleanup raised.
    ///
    /// Does nothing if the loop already ended.
    pub fn close(&mut self) -> Result<(), GeneratorError<E>> {
        if !matches!(self.state, LoopState::Running) {
            return Ok(());
        }
        self.state = LoopState::Closed;
        close(&mut self.handle).map(drop)
    }
}

impl<R: Resumable<T, E>, T, E> Iterator for ForOf<R, T, E> {
    type Item = Result<T, GeneratorError<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        while matches!(self.state, LoopState::Running) {
            match self.handle.advance(None) {
                Ok(step) if step.done => self.state = LoopState::Exhausted(step.value),
                Ok(step) => {
                    if let Some(value) = step.value {
                        return Some(Ok(value));
                    }
                }
                Err(err) => {
                    self.state = LoopState::Failed;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<R: Resumable<T, E>, T, E> std::iter::FusedIterator for ForOf<R, T, E> {}

impl<R: Resumable<T, E>, T, E> Drop for ForOf<R, T, E> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(
                invalid_state = err.is_invalid_state(),
                "closing an abandoned loop failed"
            );
        }
    }
}

impl<'a, T, E> IntoIterator for Generator<'a, T, E> {
    type Item = Result<T, GeneratorError<E>>;
    type IntoIter = ForOf<Self, T, E>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        ForOf::new(self)
    }
}

impl<'g, 'a, T, E> IntoIterator for &'g Generator<'a, T, E> {
    type Item = Result<T, GeneratorError<E>>;
    type IntoIter = ForOf<&'g Generator<'a, T, E>, T, E>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        ForOf::new(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
