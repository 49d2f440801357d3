//! Stack-saving coroutine bodies.
//!
//! A `Fiber` runs a straight-line closure on its own thread and hands
//! control back and forth with the caller through two one-slot channels.
//! The caller blocks while the body runs and the body blocks while the
//! caller runs, so only one side is ever executing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Resume (sync_channel 1)  ┌──────────────────┐
//! │   Generator  │ ────────────────────────► │   Fiber thread   │
//! │  (caller)    │                           │                  │
//! │  .resume()   │ ◄──────────────────────── │  body(&Co)       │
//! └──────────────┘  Event  (sync_channel 1)  │  co.suspend(v)?  │
//!                                            └──────────────────┘
//! ```
//!
//! Handler and cleanup regions are plain Rust:
//!
//! ```
//! use strand_vm::{Abrupt, Fiber, Generator};
//!
//! let g: Generator<'_, i32, String> = Generator::new(Fiber::spawn(|co| {
//!     co.suspend(1)?;
//!     // try { yield 2; yield 3 } finally { yield 4 }
//!     let body: Result<(), Abrupt<i32, String>> = (|| {
//!         co.suspend(2)?;
//!         co.suspend(3)?;
//!         Ok(())
//!     })();
//!     co.suspend(4)?;
//!     body?;
//!     Ok(None)
//! }));
//! assert_eq!(g.next().unwrap().value, Some(1));
//! assert_eq!(g.next().unwrap().value, Some(2));
//! assert_eq!(g.force_return(Some(7)).unwrap().value, Some(4));
//! assert_eq!(g.next().unwrap().value, Some(7));
//! ```
//!
//! # Teardown
//!
//! Dropping an unfinished fiber disconnects both channels, after which every
//! `suspend` in the body returns `Abrupt::Return(None)`, and joins the
//! thread. A body that keeps suspending after being told to return will
//! keep the drop waiting.

use std::io;
use std::panic;
use std::sync::mpsc;
use std::thread;

use tracing::{trace, warn};

use crate::generator::Generator;
use crate::routine::{Routine, RoutineResult};
use crate::signal::{Abrupt, Resume, Suspend};

/// Thread name used by [`Fiber::spawn`].
pub const DEFAULT_FIBER_NAME: &str = "strand-fiber";

/// What a fiber body's closure returns.
pub type FiberResult<T, E> = Result<Option<T>, Abrupt<T, E>>;

enum Event<T, E> {
    Yield(T),
    Finish(FiberResult<T, E>),
}

// ============================================================================
// Co
// ============================================================================

/// The body's side of a fiber.
pub struct Co<T, E> {
    resumes: mpsc::Receiver<Resume<T, E>>,
    events: mpsc::SyncSender<Event<T, E>>,
}

impl<T, E> Co<T, E> {
    /// Yields `value` and waits to be resumed.
    ///
    /// Returns the resume input, or the abrupt completion (injected error or
    /// forced return) the body should handle or propagate with `?`.
    pub fn suspend(&self, value: T) -> Result<Option<T>, Abrupt<T, E>> {
        if self.events.send(Event::Yield(value)).is_err() {
            return Err(Abrupt::Return(None));
        }
        match self.resumes.recv() {
            Ok(resume) => resume.into_input(),
            Err(_) => Err(Abrupt::Return(None)),
        }
    }

    /// Yields every item of `iter` in order, ignoring resume inputs.
    pub fn suspend_all<I>(&self, iter: I) -> Result<(), Abrupt<T, E>>
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            self.suspend(value)?;
        }
        Ok(())
    }
}

// ============================================================================
// Fiber
// ============================================================================

/// A coroutine body running on a dedicated thread.
///
/// The body closure is not called until the first resumption.
pub struct Fiber<T, E> {
    resumes: Option<mpsc::SyncSender<Resume<T, E>>>,
    events: Option<mpsc::Receiver<Event<T, E>>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<T, E> Fiber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawns a fiber on a thread named [`DEFAULT_FIBER_NAME`].
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread.
    pub fn spawn<F>(body: F) -> Self
    where
        F: FnOnce(&Co<T, E>) -> FiberResult<T, E> + Send + 'static,
    {
        Self::try_spawn_named(DEFAULT_FIBER_NAME, body).expect("failed to spawn fiber thread")
    }

    /// Spawns a fiber on a thread with the given name.
    pub fn try_spawn_named<F>(name: impl Into<String>, body: F) -> io::Result<Self>
    where
        F: FnOnce(&Co<T, E>) -> FiberResult<T, E> + Send + 'static,
    {
        let (resume_tx, resume_rx) = mpsc::sync_channel::<Resume<T, E>>(1);
        let (event_tx, event_rx) = mpsc::sync_channel::<Event<T, E>>(1);

        let worker = thread::Builder::new().name(name.into()).spawn(move || {
            let Ok(first) = resume_rx.recv() else {
                return;
            };
            let co = Co {
                resumes: resume_rx,
                events: event_tx,
            };
            let outcome = match first.into_input() {
                Ok(_) => body(&co),
                Err(abrupt) => Err(abrupt),
            };
            // The receiver is gone if the fiber was dropped mid-body.
            let _ = co.events.send(Event::Finish(outcome));
        })?;

        Ok(Self {
            resumes: Some(resume_tx),
            events: Some(event_rx),
            worker: Some(worker),
        })
    }
}

impl<T, E> Fiber<T, E> {
    /// Returns true once the body has finished and its thread was joined.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.worker.is_none()
    }

    /// Joins the body thread, re-raising its panic on this thread.
    fn join(&mut self) {
        self.resumes = None;
        if let Some(worker) = self.worker.take() {
            if let Err(payload) = worker.join() {
                panic::resume_unwind(payload);
            }
        }
    }

    fn exchange(&mut self, resume: Resume<T, E>) -> Option<Event<T, E>> {
        let resumes = self.resumes.as_ref()?;
        resumes.send(resume).ok()?;
        self.events.as_ref()?.recv().ok()
    }
}

impl<'a, T, E> Routine<'a, T, E> for Fiber<T, E> {
    fn resume(&mut self, resume: Resume<T, E>) -> RoutineResult<'a, T, E> {
        match self.exchange(resume) {
            Some(Event::Yield(value)) => Ok(Suspend::Yield(value)),
            Some(Event::Finish(outcome)) => {
                self.join();
                trace!("fiber body finished");
                outcome.map(Suspend::Complete)
            }
            None => {
                // The body thread went away without reporting: it panicked.
                self.join();
                Ok(Suspend::done())
            }
        }
    }
}

impl<T, E> Drop for Fiber<T, E> {
    fn drop(&mut self) {
        self.resumes = None;
        self.events = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("fiber body panicked during teardown");
            }
        }
    }
}

impl<T, E> Generator<'_, T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a generator whose body runs as a [`Fiber`].
    pub fn fiber<F>(body: F) -> Self
    where
        F: FnOnce(&Co<T, E>) -> FiberResult<T, E> + Send + 'static,
    {
        Self::new(Fiber::spawn(body))
    }
}

// ============================================================================
// Tests
// ============================================================================
