//! Generator-backed iterators.
//!
//! A `Generator` drives a [`Routine`] through the suspend/resume protocol:
//!
//! - `advance(input)`  resume normally, `input` becomes the suspension value
//! - `inject_error(e)` raise `e` at the suspension point
//! - `force_return(v)` terminate early, letting cleanup regions run first
//!
//! # Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ GeneratorHeader (state + resume index, read before borrowing) │
//! ├───────────────────────────────────────────────────────────────┤
//! │ GeneratorConfig (name, strict start)                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │ RefCell<Frame>                                                │
//! │   routine:  Option<Box<dyn Routine>>    dropped on completion │
//! │   delegate: Option<Box<dyn Resumable>>  active `yield*` inner │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes `&self`. The header is checked before the frame is
//! borrowed, so a body that reaches its own handle gets
//! `InvalidState::AlreadyExecuting` instead of a corrupted frame.
//!
//! # Delegation
//!
//! While a delegate is active every resumption is forwarded to it. The body
//! only runs again once the delegate reports `done`:
//!
//! ```text
//! delegate result          body resumed with
//! ─────────────────────    ──────────────────────────────
//! done after next/throw    Resume::Next(completion value)
//! done after return        Resume::Return(completion value)
//! body error escaped       Resume::Throw(error)
//! invalid state            (not resumed, error to caller)
//! ```

use std::cell::RefCell;
use std::fmt;

use strand_core::{GeneratorError, GeneratorHeader, GeneratorState, InvalidState, Step, StepResult};
use tracing::{debug, trace};

use crate::config::GeneratorConfig;
use crate::iterator::Resumable;
use crate::routine::{self, Routine, RoutineResult};
use crate::signal::{Abrupt, Resume, Suspend};

// ============================================================================
// Frame
// ============================================================================

/// Which public operation started a resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Advance,
    Inject,
    Return,
}

impl Origin {
    fn name(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Inject => "inject_error",
            Self::Return => "force_return",
        }
    }
}

/// How a resumption ended, before the header is updated.
enum Outcome<T, E> {
    Suspended(Option<T>),
    Completed(Option<T>),
    Raised(E),
    /// A delegate refused the resumption. `entered` records whether the
    /// routine itself ran during this call.
    Rejected { state: InvalidState, entered: bool },
}

struct Frame<'a, T, E> {
    routine: Option<Box<dyn Routine<'a, T, E> + 'a>>,
    delegate: Option<Box<dyn Resumable<T, E> + 'a>>,
}

impl<'a, T, E> Frame<'a, T, E> {
    fn run(&mut self, mut resume: Resume<T, E>) -> Outcome<T, E> {
        let mut entered = false;
        loop {
            if let Some(inner) = self.delegate.as_mut() {
                let returning = resume.is_return();
                let forwarded = match resume {
                    Resume::Next(input) => inner.advance(input),
                    Resume::Throw(err) => inner.inject_error(err),
                    Resume::Return(value) => inner.force_return(value),
                };
                resume = match forwarded {
                    Ok(step) if !step.done => return Outcome::Suspended(step.value),
                    Ok(step) if returning => Resume::Return(step.value),
                    Ok(step) => Resume::Next(step.value),
                    Err(GeneratorError::InvalidState(state)) => {
                        return Outcome::Rejected { state, entered };
                    }
                    Err(
                        GeneratorError::UnhandledInjected(err) | GeneratorError::PropagatedBody(err),
                    ) => Resume::Throw(err),
                };
                self.delegate = None;
                continue;
            }

            let Some(routine) = self.routine.as_mut() else {
                return Outcome::Completed(None);
            };
            entered = true;
            match routine.resume(resume) {
                Ok(Suspend::Yield(value)) => return Outcome::Suspended(Some(value)),
                Ok(Suspend::Delegate(inner)) => {
                    self.delegate = Some(inner);
                    resume = Resume::Next(None);
                }
                Ok(Suspend::Complete(value)) | Err(Abrupt::Return(value)) => {
                    return Outcome::Completed(value);
                }
                Err(Abrupt::Throw(err)) => return Outcome::Raised(err),
            }
        }
    }
}

/// Marks the header completed if a routine panics mid-resumption.
struct ExecutionGuard<'h> {
    header: &'h GeneratorHeader,
    armed: bool,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.header.complete();
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

/// A resumable coroutine exposed through the iterator contract.
///
/// `'a` bounds whatever the routine and its delegates borrow.
pub struct Generator<'a, T, E> {
    header: GeneratorHeader,
    config: GeneratorConfig,
    frame: RefCell<Frame<'a, T, E>>,
}

impl<'a, T, E> Generator<'a, T, E> {
    /// Creates a generator in `SuspendedStart`. The routine does not run
    /// until the first `advance`.
    #[inline]
    pub fn new<R>(routine: R) -> Self
    where
        R: Routine<'a, T, E> + 'a,
    {
        Self::with_config(routine, GeneratorConfig::default())
    }

    /// Creates a generator with explicit configuration.
    pub fn with_config<R>(routine: R, config: GeneratorConfig) -> Self
    where
        R: Routine<'a, T, E> + 'a,
    {
        Self {
            header: GeneratorHeader::new(),
            config,
            frame: RefCell::new(Frame {
                routine: Some(Box::new(routine)),
                delegate: None,
            }),
        }
    }

    /// Creates a generator whose body is a closure called once per
    /// resumption.
    #[inline]
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(Resume<T, E>) -> RoutineResult<'a, T, E> + 'a,
    {
        Self::new(routine::from_fn(f))
    }

    // ════════════════════════════════════════════════════════════════════════
    // Accessors
    // ════════════════════════════════════════════════════════════════════════

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> GeneratorState {
        self.header.state()
    }

    /// Number of suspensions so far.
    #[inline]
    pub fn resume_index(&self) -> u32 {
        self.header.resume_index()
    }

    /// Returns true once the generator can never produce another value.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.header.is_completed()
    }

    /// Configured name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.config.name()
    }

    /// The configuration this generator was built with.
    #[inline]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns true while a `yield*` delegate is active.
    ///
    /// Always false while the generator is executing.
    pub fn is_delegating(&self) -> bool {
        self.frame
            .try_borrow()
            .map(|frame| frame.delegate.is_some())
            .unwrap_or(false)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Protocol
    // ════════════════════════════════════════════════════════════════════════

    /// `advance(None)`.
    #[inline]
    pub fn next(&self) -> StepResult<T, E> {
        self.advance(None)
    }

    /// Resumes from the last suspension point with `input` as its value.
    ///
    /// The first call ignores `input` unless the generator was configured
    /// with `strict_start`, in which case an input is rejected and the
    /// generator stays in `SuspendedStart`.
    pub fn advance(&self, input: Option<T>) -> StepResult<T, E> {
        match self.header.state() {
            GeneratorState::Completed => Ok(Step::exhausted()),
            GeneratorState::Executing => Err(InvalidState::AlreadyExecuting.into()),
            GeneratorState::SuspendedStart => {
                if input.is_some() && self.config.is_strict_start() {
                    return Err(InvalidState::InputBeforeStart.into());
                }
                self.resume(Resume::Next(None), Origin::Advance)
            }
            GeneratorState::SuspendedYield => self.resume(Resume::Next(input), Origin::Advance),
        }
    }

    /// Raises `err` at the current suspension point.
    ///
    /// A never-started generator completes without running its body and
    /// the error propagates. A completed one rejects the call.
    pub fn inject_error(&self, err: E) -> StepResult<T, E> {
        match self.header.state() {
            GeneratorState::Completed => Err(InvalidState::InjectAfterCompletion.into()),
            GeneratorState::Executing => Err(InvalidState::AlreadyExecuting.into()),
            GeneratorState::SuspendedStart => {
                self.finish();
                debug!(
                    generator = self.config.label(),
                    "error injected before start"
                );
                Err(GeneratorError::UnhandledInjected(err))
            }
            GeneratorState::SuspendedYield => self.resume(Resume::Throw(err), Origin::Inject),
        }
    }

    /// Terminates early with `value`.
    ///
    /// Cleanup regions around the current suspension point still run and may
    /// yield; the requested value is reported once they re-raise the return.
    /// A completed generator is left alone and reports the bare terminal step.
    pub fn force_return(&self, value: Option<T>) -> StepResult<T, E> {
        match self.header.state() {
            GeneratorState::Completed => Ok(Step::exhausted()),
            GeneratorState::Executing => Err(InvalidState::AlreadyExecuting.into()),
            GeneratorState::SuspendedStart => {
                self.finish();
                debug!(generator = self.config.label(), "returned before start");
                Ok(Step::complete(value))
            }
            GeneratorState::SuspendedYield => self.resume(Resume::Return(value), Origin::Return),
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Execution
    // ════════════════════════════════════════════════════════════════════════

    fn resume(&self, resume: Resume<T, E>, origin: Origin) -> StepResult<T, E> {
        let Some(previous) = self.header.try_start() else {
            return Err(InvalidState::AlreadyExecuting.into());
        };
        trace!(
            generator = self.config.label(),
            from = %previous,
            resume = resume.kind(),
            index = self.header.resume_index(),
            "resuming"
        );

        let mut guard = ExecutionGuard {
            header: &self.header,
            armed: true,
        };
        let outcome = self.frame.borrow_mut().run(resume);
        guard.armed = false;

        self.settle(outcome, origin, previous)
    }

    fn settle(
        &self,
        outcome: Outcome<T, E>,
        origin: Origin,
        previous: GeneratorState,
    ) -> StepResult<T, E> {
        match outcome {
            Outcome::Suspended(value) => {
                let index = self.header.suspend();
                trace!(generator = self.config.label(), index, "suspended");
                Ok(Step { value, done: false })
            }
            Outcome::Completed(value) => {
                self.finish();
                debug!(
                    generator = self.config.label(),
                    via = origin.name(),
                    has_value = value.is_some(),
                    "completed"
                );
                Ok(Step::complete(value))
            }
            Outcome::Raised(err) => {
                self.finish();
                debug!(
                    generator = self.config.label(),
                    via = origin.name(),
                    "error escaped generator body"
                );
                Err(match origin {
                    Origin::Inject => GeneratorError::UnhandledInjected(err),
                    Origin::Advance | Origin::Return => GeneratorError::PropagatedBody(err),
                })
            }
            Outcome::Rejected { state, entered } => {
                // Once the routine has run it is parked at the delegation
                // point, even if the resumption started from SuspendedStart.
                if entered {
                    self.header.suspend();
                } else {
                    self.header.restore(previous);
                }
                debug!(
                    generator = self.config.label(),
                    %state,
                    entered,
                    "delegate rejected resumption"
                );
                Err(state.into())
            }
        }
    }

    /// Completes the header and releases the body.
    fn finish(&self) {
        self.header.complete();
        let (routine, delegate) = {
            let mut frame = self.frame.borrow_mut();
            (frame.routine.take(), frame.delegate.take())
        };
        drop(delegate);
        drop(routine);
    }
}

impl<T, E> fmt::Debug for Generator<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.config.name())
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Iterator Contract
// ============================================================================

impl<T, E> Resumable<T, E> for Generator<'_, T, E> {
    #[inline]
    fn advance(&mut self, input: Option<T>) -> StepResult<T, E> {
        Generator::advance(self, input)
    }

    #[inline]
    fn inject_error(&mut self, err: E) -> StepResult<T, E> {
        Generator::inject_error(self, err)
    }

    #[inline]
    fn force_return(&mut self, value: Option<T>) -> StepResult<T, E> {
        Generator::force_return(self, value)
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.is_completed()
    }
}

impl<T, E> Resumable<T, E> for &Generator<'_, T, E> {
    #[inline]
    fn advance(&mut self, input: Option<T>) -> StepResult<T, E> {
        Generator::advance(self, input)
    }

    #[inline]
    fn inject_error(&mut self, err: E) -> StepResult<T, E> {
        Generator::inject_error(self, err)
    }

    #[inline]
    fn force_return(&mut self, value: Option<T>) -> StepResult<T, E> {
        Generator::force_return(self, value)
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.is_completed()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::{Rc, Weak};

    type Gen = Generator<'static, i32, String>;

    /// Yields each of `values`, then completes with `ret`.
    fn counting(values: Vec<i32>, ret: Option<i32>) -> Gen {
        let mut pc = 0;
        Generator::from_fn(move |resume: Resume<i32, String>| {
            resume.into_input()?;
            let step = match values.get(pc) {
                Some(v) => Suspend::Yield(*v),
                None => Suspend::Complete(ret),
            };
            pc += 1;
            Ok(step)
        })
    }

    // ════════════════════════════════════════════════════════════════════════
    // Advancement
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_yields_then_completion_value_once() {
        let g = counting(vec![1, 2, 3], Some(99));
        assert_eq!(g.state(), GeneratorState::SuspendedStart);
        assert_eq!(g.next(), Ok(Step::yielded(1)));
        assert_eq!(g.state(), GeneratorState::SuspendedYield);
        assert_eq!(g.next(), Ok(Step::yielded(2)));
        assert_eq!(g.next(), Ok(Step::yielded(3)));
        assert_eq!(g.next(), Ok(Step::complete(Some(99))));
        assert_eq!(g.state(), GeneratorState::Completed);
        assert_eq!(g.next(), Ok(Step::exhausted()));
        assert_eq!(g.next(), Ok(Step::exhausted()));
        assert_eq!(g.resume_index(), 3);
    }

    #[test]
    fn test_empty_body_completes_on_first_advance() {
        let g = counting(vec![], None);
        assert_eq!(g.next(), Ok(Step::exhausted()));
        assert!(g.is_completed());
    }

    #[test]
    fn test_first_input_is_ignored() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let g: Gen = Generator::from_fn(move |resume: Resume<i32, String>| {
            log.borrow_mut().push(resume.into_input()?);
            Ok(Suspend::Yield(0))
        });
        g.advance(Some(5)).unwrap();
        g.advance(Some(6)).unwrap();
        assert_eq!(*seen.borrow(), vec![None, Some(6)]);
    }

    #[test]
    fn test_strict_start_rejects_first_input() {
        let g: Gen = Generator::with_config(
            routine::from_fn(|resume: Resume<i32, String>| {
                resume.into_input()?;
                Ok(Suspend::Yield(1))
            }),
            GeneratorConfig::default().named("strict").strict_start(true),
        );
        assert_eq!(
            g.advance(Some(3)),
            Err(GeneratorError::InvalidState(InvalidState::InputBeforeStart))
        );
        assert_eq!(g.state(), GeneratorState::SuspendedStart);
        assert_eq!(g.advance(None), Ok(Step::yielded(1)));
        assert_eq!(g.advance(Some(3)), Ok(Step::yielded(1)));
        assert_eq!(g.name(), Some("strict"));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Return / Throw from the edges of the lifecycle
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_force_return_before_start_skips_body() {
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        let g: Gen = Generator::from_fn(move |_| {
            *flag.borrow_mut() = true;
            Ok(Suspend::Yield(1))
        });
        assert_eq!(g.force_return(Some(4)), Ok(Step::complete(Some(4))));
        assert!(!*ran.borrow());
        assert_eq!(g.next(), Ok(Step::exhausted()));
    }

    #[test]
    fn test_force_return_on_completed_is_noop() {
        let g = counting(vec![], Some(1));
        g.next().unwrap();
        assert_eq!(g.force_return(Some(2)), Ok(Step::exhausted()));
    }

    #[test]
    fn test_inject_before_start_propagates() {
        let g = counting(vec![1], None);
        assert_eq!(
            g.inject_error("early".into()),
            Err(GeneratorError::UnhandledInjected("early".to_string()))
        );
        assert!(g.is_completed());
    }

    #[test]
    fn test_inject_after_completion_is_invalid() {
        let g = counting(vec![], None);
        g.next().unwrap();
        assert_eq!(
            g.inject_error("late".into()),
            Err(GeneratorError::InvalidState(
                InvalidState::InjectAfterCompletion
            ))
        );
    }

    #[test]
    fn test_unhandled_injection_completes() {
        let g = counting(vec![1, 2], None);
        g.next().unwrap();
        assert_eq!(
            g.inject_error("a".into()),
            Err(GeneratorError::UnhandledInjected("a".to_string()))
        );
        assert_eq!(g.next(), Ok(Step::exhausted()));
    }

    #[test]
    fn test_body_error_is_propagated_body() {
        let g: Gen = Generator::from_fn(|resume: Resume<i32, String>| {
            match resume.into_input()? {
                None => Ok(Suspend::Yield(3)),
                Some(_) => Err(Abrupt::throw("x.toUpperCase is not a function".into())),
            }
        });
        g.next().unwrap();
        let err = g.advance(Some(42)).unwrap_err();
        assert!(matches!(err, GeneratorError::PropagatedBody(_)));
        assert!(g.is_completed());
    }

    // ════════════════════════════════════════════════════════════════════════
    // Reentrancy / Panics
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_reentrant_advance_is_rejected() {
        let g: Rc<Gen> = Rc::new_cyclic(|me: &Weak<Gen>| {
            let me = me.clone();
            Generator::from_fn(move |resume: Resume<i32, String>| {
                resume.into_input()?;
                let reentry = me.upgrade().map(|g| g.advance(None));
                match reentry {
                    Some(Err(GeneratorError::InvalidState(InvalidState::AlreadyExecuting))) => {
                        Ok(Suspend::Yield(1))
                    }
                    _ => Ok(Suspend::Yield(0)),
                }
            })
        });
        assert_eq!(g.next(), Ok(Step::yielded(1)));
        assert_eq!(g.state(), GeneratorState::SuspendedYield);
        assert_eq!(g.next(), Ok(Step::yielded(1)));
    }

    #[test]
    fn test_panic_leaves_generator_completed() {
        let g: Gen = Generator::from_fn(|_| panic!("body blew up"));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| g.next()));
        assert!(result.is_err());
        assert!(g.is_completed());
        assert_eq!(g.next(), Ok(Step::exhausted()));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Delegation
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_delegate_to_sequence() {
        let mut pc = 0;
        let g: Gen = Generator::from_fn(move |resume: Resume<i32, String>| {
            resume.into_input()?;
            pc += 1;
            match pc {
                1 => Ok(Suspend::Yield(1)),
                2 => Ok(Suspend::delegate_iter(vec![2, 3, 4])),
                3 => Ok(Suspend::Yield(5)),
                _ => Ok(Suspend::done()),
            }
        });
        let mut seen = Vec::new();
        loop {
            let step = g.next().unwrap();
            if step.done {
                break;
            }
            if g.is_delegating() {
                seen.push(-1);
            }
            seen.push(step.value.unwrap());
        }
        assert_eq!(seen, vec![1, -1, 2, -1, 3, -1, 4, 5]);
    }

    #[test]
    fn test_delegate_completion_value_reaches_body() {
        let inner = counting(vec![2, 3], Some(70));
        let mut inner = Some(inner);
        let mut got = None;
        let got_ref = &mut got;
        let outer: Generator<'_, i32, String> = Generator::from_fn(move |resume: Resume<i32, String>| {
            let input = resume.into_input()?;
            match inner.take() {
                Some(g) => Ok(Suspend::delegate(g)),
                None => {
                    *got_ref = input;
                    Ok(Suspend::done())
                }
            }
        });
        assert_eq!(outer.next(), Ok(Step::yielded(2)));
        assert_eq!(outer.next(), Ok(Step::yielded(3)));
        assert_eq!(outer.next(), Ok(Step::exhausted()));
        drop(outer);
        assert_eq!(got, Some(70));
    }

    #[test]
    fn test_debug_output() {
        let g = counting(vec![1], None);
        let debug = format!("{:?}", g);
        assert!(debug.contains("Generator"));
        assert!(debug.contains("SuspendedStart"));
    }
}
