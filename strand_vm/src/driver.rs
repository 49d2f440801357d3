//! Generator-based task runners.
//!
//! A task is a generator whose yielded values are requests. The runner hands
//! each request to a resolver and feeds the answer back in: `Ok(v)` resumes
//! the task with `v`, `Err(e)` is injected at the same suspension point so
//! the task can handle it like any other error.
//!
//! ```text
//!   task                         runner                  resolver
//!    │  yield request ──────────► │                          │
//!    │                            │ ── resolve(request) ───► │
//!    │                            │ ◄── Ok(v) / Err(e) ───── │
//!    │  ◄── advance(Some(v)) ──── │                          │
//!    │  ◄── inject_error(e) ───── │                          │
//! ```
//!
//! [`run`] drives a single task. [`Scheduler`] interleaves several, one step
//! per turn.

use std::collections::VecDeque;
use std::fmt;

use strand_core::{GeneratorError, StepResult};
use tracing::{debug, trace};

use crate::consumer;
use crate::iterator::Resumable;
use crate::signal::Resume;

/// What a finished task produced: its completion value or the error that
/// ended it.
pub type TaskResult<T, E> = Result<Option<T>, GeneratorError<E>>;

/// Drives `handle` to completion, resolving every yielded request.
///
/// Non-terminal steps without a value are resumed with no input.
pub fn run<T, E, R, F>(handle: &mut R, mut resolve: F) -> TaskResult<T, E>
where
    R: Resumable<T, E> + ?Sized,
    F: FnMut(T) -> Result<T, E>,
{
    let mut step = handle.advance(None)?;
    let mut requests = 0usize;
    while !step.done {
        step = match step.value {
            None => handle.advance(None)?,
            Some(request) => {
                requests += 1;
                match resolve(request) {
                    Ok(answer) => handle.advance(Some(answer))?,
                    Err(err) => handle.inject_error(err)?,
                }
            }
        };
    }
    trace!(requests, "task finished");
    Ok(step.value)
}

/// Resumes `handle` the way `resume` says.
fn resume_with<T, E, R>(handle: &mut R, resume: Resume<T, E>) -> StepResult<T, E>
where
    R: Resumable<T, E> + ?Sized,
{
    match resume {
        Resume::Next(input) => handle.advance(input),
        Resume::Throw(err) => handle.inject_error(err),
        Resume::Return(value) => handle.force_return(value),
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Identifies a task within its [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u32);

impl TaskId {
    /// The raw id, in spawn order starting at zero.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A task that finished during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome<T, E> {
    /// The task that finished.
    pub id: TaskId,
    /// Its completion value, or the error that ended it.
    pub result: TaskResult<T, E>,
}

struct Task<'a, T, E> {
    id: TaskId,
    handle: Box<dyn Resumable<T, E> + 'a>,
    /// How the task is resumed on its next turn.
    pending: Resume<T, E>,
}

impl<T, E> Task<'_, T, E> {
    /// Advances the task by one step. Returns its result once it finishes.
    fn step<F>(&mut self, resolve: &mut F) -> Option<TaskResult<T, E>>
    where
        F: FnMut(T) -> Result<T, E>,
    {
        let resume = std::mem::replace(&mut self.pending, Resume::Next(None));
        match resume_with(&mut self.handle, resume) {
            Err(err) => Some(Err(err)),
            Ok(step) if step.done => Some(Ok(step.value)),
            Ok(step) => {
                if let Some(request) = step.value {
                    self.pending = match resolve(request) {
                        Ok(answer) => Resume::Next(Some(answer)),
                        Err(err) => Resume::Throw(err),
                    };
                }
                None
            }
        }
    }
}

/// Cooperative round-robin over task generators.
///
/// Every turn advances the task at the front of the queue by exactly one
/// step and moves it to the back unless it finished. Nothing is preempted:
/// a task that never yields holds the scheduler until it does.
pub struct Scheduler<'a, T, E> {
    tasks: VecDeque<Task<'a, T, E>>,
    next_id: u32,
}

impl<'a, T, E> Scheduler<'a, T, E> {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            next_id: 0,
        }
    }

    /// Queues `handle` behind the existing tasks.
    pub fn spawn<R>(&mut self, handle: R) -> TaskId
    where
        R: Resumable<T, E> + 'a,
    {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push_back(Task {
            id,
            handle: Box::new(handle),
            pending: Resume::Next(None),
        });
        debug!(%id, queued = self.tasks.len(), "task spawned");
        id
    }

    /// Number of unfinished tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if no task is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns true if `id` is still queued.
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }

    /// Runs one turn. Returns the outcome if the task finished on it.
    pub fn turn<F>(&mut self, resolve: &mut F) -> Option<TaskOutcome<T, E>>
    where
        F: FnMut(T) -> Result<T, E>,
    {
        let mut task = self.tasks.pop_front()?;
        trace!(id = %task.id, "turn");
        match task.step(resolve) {
            Some(result) => {
                debug!(id = %task.id, failed = result.is_err(), "task finished");
                Some(TaskOutcome {
                    id: task.id,
                    result,
                })
            }
            None => {
                self.tasks.push_back(task);
                None
            }
        }
    }

    /// Runs turns until every task has finished, returning the outcomes in
    /// completion order.
    pub fn run_until_complete<F>(&mut self, mut resolve: F) -> Vec<TaskOutcome<T, E>>
    where
        F: FnMut(T) -> Result<T, E>,
    {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        while !self.tasks.is_empty() {
            outcomes.extend(self.turn(&mut resolve));
        }
        outcomes
    }

    /// Removes `id` from the queue and closes it, letting its cleanup run.
    ///
    /// Returns `None` if no such task is queued. A request the task had
    /// pending is dropped unanswered, and so is any value its cleanup
    /// yields; the handle is dropped either way.
    pub fn cancel(&mut self, id: TaskId) -> Option<Result<(), GeneratorError<E>>> {
        let position = self.tasks.iter().position(|task| task.id == id)?;
        let mut task = self.tasks.remove(position)?;
        debug!(%id, "task cancelled");
        Some(consumer::close(&mut task.handle).map(drop))
    }
}

impl<T, E> Default for Scheduler<'_, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Scheduler<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.iter().map(|t| t.id).collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
