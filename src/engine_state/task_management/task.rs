//! # Task System Core Traits
//!
//! This module defines the building blocks of the task system, which executes
//! CPU-heavy work on a pool of worker threads.
//!
//! ## Core Components
//! - `Task`: a unit of work that can be executed on a worker
//! - `TaskResult`: what a worker sends back for every task it received
//! - `TaskOutcome`: completed, cancelled before it started, or failed with a panic
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The worker checks `is_cancelled()`; cancelled tasks are not processed
//! 3. Otherwise `process()` runs, with panics caught and reported as failures
//! 4. A `TaskResult` carrying the task's id is returned to the main thread
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `Task::Output` must be `Send` to be transferred back to the main thread
//! - Tasks own all their input; nothing is borrowed from the main thread

use std::fmt::Debug;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks should be self-contained and own all the data they need.
///
/// # Implementation Guidelines
/// - Should be relatively coarse-grained to amortize scheduling overhead
/// - Should avoid holding references to data that might be modified elsewhere
/// - A panic inside `process()` fails only this task
pub trait Task: Send + 'static {
    /// Identifies the task in its result, so the main thread can match it to its origin.
    type Id: Copy + Debug + Send + 'static;

    /// The value a successful task produces.
    type Output: Send + 'static;

    /// Returns the identity reported back with the result.
    fn id(&self) -> Self::Id;

    /// Whether the task was cancelled after it was published.
    ///
    /// Checked by the worker right before processing. Cancellation is best-effort:
    /// a task already running is not interrupted.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Processes the task.
    ///
    /// Runs on a background thread and should avoid blocking operations that
    /// could starve other tasks.
    fn process(&self) -> Self::Output;
}

/// How a task ended.
#[derive(Debug)]
pub enum TaskOutcome<O> {
    /// The task ran to completion
    Completed(O),
    /// The task was cancelled before a worker started it
    Cancelled,
    /// The task panicked; carries the panic message
    Failed(String),
}

/// The result of a task, as received on the main thread.
pub struct TaskResult<T: Task> {
    pub id: T::Id,
    pub outcome: TaskOutcome<T::Output>,
}
