//! The iterator contract.
//!
//! Anything that can be stepped implements [`Resumable`]: plain sequences,
//! generators, boxed or borrowed handles. The consumer loop, delegation and
//! the task drivers are all written against this one trait.
//!
//! # Semantics
//!
//! ```text
//! let it = Sequence::new(["a", "b"]);
//! it.advance(None)  // { value: "a", done: false }
//! it.advance(None)  // { value: "b", done: false }
//! it.advance(None)  // { value: None, done: true }
//! it.advance(None)  // { value: None, done: true }   (forever)
//! ```
//!
//! # Ownership
//!
//! A handle is exclusively owned by whoever is stepping it. Nothing here is
//! `Sync`; sharing one handle between independent consumers has no defined
//! merged-cursor meaning.

use strand_core::{GeneratorError, InvalidState, Step, StepResult};

// ============================================================================
// Resumable
// ============================================================================

/// A handle that produces a sequence one `Step` at a time.
pub trait Resumable<T, E> {
    /// Produces the next step. `input` becomes the value of the suspension
    /// expression the handle is paused at; handles without suspension
    /// points ignore it.
    fn advance(&mut self, input: Option<T>) -> StepResult<T, E>;

    /// Raises `err` at the current suspension point.
    ///
    /// The default has no handler region: the error propagates and the
    /// handle should be considered finished.
    fn inject_error(&mut self, err: E) -> StepResult<T, E> {
        Err(GeneratorError::UnhandledInjected(err))
    }

    /// Terminates early, running any pending cleanup.
    fn force_return(&mut self, value: Option<T>) -> StepResult<T, E> {
        Ok(Step::complete(value))
    }

    /// Returns true once the handle will only ever produce the bare
    /// terminal step.
    fn is_finished(&self) -> bool {
        false
    }
}

impl<T, E, R: Resumable<T, E> + ?Sized> Resumable<T, E> for Box<R> {
    #[inline]
    fn advance(&mut self, input: Option<T>) -> StepResult<T, E> {
        (**self).advance(input)
    }

    #[inline]
    fn inject_error(&mut self, err: E) -> StepResult<T, E> {
        (**self).inject_error(err)
    }

    #[inline]
    fn force_return(&mut self, value: Option<T>) -> StepResult<T, E> {
        (**self).force_return(value)
    }

    #[inline]
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

impl<T, E, R: Resumable<T, E> + ?Sized> Resumable<T, E> for &mut R {
    #[inline]
    fn advance(&mut self, input: Option<T>) -> StepResult<T, E> {
        (**self).advance(input)
    }

    #[inline]
    fn inject_error(&mut self, err: E) -> StepResult<T, E> {
        (**self).inject_error(err)
    }

    #[inline]
    fn force_return(&mut self, value: Option<T>) -> StepResult<T, E> {
        (**self).force_return(value)
    }

    #[inline]
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

// ============================================================================
// Sequence
// ============================================================================

/// Adapts a Rust iterator to the iterator contract.
///
/// The wrapped iterator is dropped as soon as it is exhausted or the
/// sequence is force-returned, so anything it owns (a file, a lock guard)
/// is released at that point rather than when the `Sequence` goes away.
#[derive(Debug, Clone)]
pub struct Sequence<I> {
    /// `None` once exhausted or closed.
    iter: Option<I>,
}

impl<I: Iterator> Sequence<I> {
    /// Wraps anything iterable.
    #[inline]
    pub fn new<S>(source: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: Some(source.into_iter()),
        }
    }

    /// Returns true while the underlying iterator is still held.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.iter.is_some()
    }

    fn pull(&mut self) -> Step<I::Item> {
        let Some(iter) = self.iter.as_mut() else {
            return Step::exhausted();
        };
        match iter.next() {
            Some(value) => Step::yielded(value),
            None => {
                self.iter = None;
                Step::exhausted()
            }
        }
    }
}

impl<T, E, I: Iterator<Item = T>> Resumable<T, E> for Sequence<I> {
    #[inline]
    fn advance(&mut self, _input: Option<T>) -> StepResult<T, E> {
        Ok(self.pull())
    }

    fn inject_error(&mut self, err: E) -> StepResult<T, E> {
        if self.iter.take().is_none() {
            return Err(InvalidState::SequenceClosed.into());
        }
        Err(GeneratorError::UnhandledInjected(err))
    }

    fn force_return(&mut self, value: Option<T>) -> StepResult<T, E> {
        match self.iter.take() {
            Some(_) => Ok(Step::complete(value)),
            None => Ok(Step::exhausted()),
        }
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.iter.is_none()
    }
}

/// Builds a sequence from a closure, like `std::iter::from_fn`.
///
/// Returning `None` ends the sequence for good; the closure is never
/// called again afterwards.
#[inline]
pub fn sequence_from_fn<T, F>(f: F) -> Sequence<std::iter::FromFn<F>>
where
    F: FnMut() -> Option<T>,
{
    Sequence::new(std::iter::from_fn(f))
}

// ============================================================================
// Tests
// ============================================================================
