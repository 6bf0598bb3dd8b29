//! # Task Management System
//!
//! This module provides a task management system for executing work on a pool of
//! worker threads while the main thread stays responsive.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskResult`: The outcome of a task, tagged with the task's id
//! - `TaskChannel`: Communication channel between the main thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back a `TaskResult`, even when the task panicked
//! 4. Results are collected on the main thread in `process_completed_tasks()`
//! 5. `shutdown()` drops queued work and joins every worker
//!
//! ## Performance Considerations
//! - **Task Granularity**: Balance between too small (high overhead) and too large (poor load balancing)
//! - **Memory**: Each task should own its data to avoid excessive cloning
//! - **Blocking**: `publish_task()` and `process_completed_tasks()` never block
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut task_manager = TaskManager::new(num_workers);
//!
//! // Publish a task for background processing
//! task_manager.publish_task(MyTask::new(...));
//!
//! // In your main/game loop:
//! for result in task_manager.process_completed_tasks() {
//!     // apply result
//! }
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use std::{
    any::Any,
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{channel, Receiver, Sender},
    thread::{self, JoinHandle},
};

use log::{debug, info};
use task::{Task, TaskOutcome, TaskResult};

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker; `None` once shut down
/// - `result_receiver`: Receives task results from worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `worker`: Handle to the worker thread, taken when joining
pub struct TaskChannel<T: Task> {
    task_sender: Option<Sender<T>>,
    result_receiver: Receiver<TaskResult<T>>,
    num_tasks_in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Collecting task results
/// - Handling task queuing when all workers are busy
/// - Joining the workers on shutdown
///
/// # Implementation Notes
/// - Main thread only: publishing and collecting happen on the owning thread
/// - Drop-safe: dropping the manager shuts it down
/// - Panic-safe: a panicking task is reported as `TaskOutcome::Failed`
pub struct TaskManager<T: Task> {
    channels: Vec<TaskChannel<T>>,
    queued_tasks: VecDeque<T>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Keeping this at 1 leaves the rest of the work in `queued_tasks`, where
/// priority tasks can still jump ahead and cancelled tasks are skipped cheaply.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl<T: Task> TaskManager<T> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} task workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for worker_index in 0..num_workers {
            let (task_tx, task_rx) = channel::<T>();
            let (result_tx, result_rx) = channel::<TaskResult<T>>();

            let task_closure = move || {
                debug!("Task worker {} started", worker_index);
                while let Ok(task) = task_rx.recv() {
                    let id = task.id();
                    let outcome = if task.is_cancelled() {
                        TaskOutcome::Cancelled
                    } else {
                        match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
                            Ok(output) => TaskOutcome::Completed(output),
                            Err(payload) => TaskOutcome::Failed(panic_message(payload)),
                        }
                    };
                    if result_tx.send(TaskResult { id, outcome }).is_err() {
                        break;
                    }
                }
                debug!("Task worker {} exiting", worker_index);
            };

            let worker = thread::Builder::new()
                .name(format!("chunk-builder-{}", worker_index))
                .spawn(task_closure)
                .expect("failed to spawn task worker thread");

            channels.push(TaskChannel {
                task_sender: Some(task_tx),
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                worker: Some(worker),
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (worker disconnected or shut down)
    fn try_send_task(&mut self, task: T, channel_idx: usize) -> Result<(), T> {
        let channel = &mut self.channels[channel_idx];
        let Some(sender) = &channel.task_sender else {
            return Err(task);
        };
        match sender.send(task) {
            Ok(_) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel that can accept a new task.
    ///
    /// Round-robin from the last used channel, skipping channels that have
    /// reached `MAX_TASKS_IN_FLIGHT`.
    ///
    /// # Returns
    /// - `Some(usize)` index of an available channel
    /// - `None` if all channels are busy or there are no channels
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&index| {
                let channel = &self.channels[index];
                channel.task_sender.is_some() && channel.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
            })
    }

    /// Publishes a new task for execution.
    ///
    /// The task will be executed as soon as a worker becomes available, or queued
    /// behind earlier tasks if all workers are busy.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: T) -> bool {
        self.publish(task, false)
    }

    /// Publishes a task ahead of everything already queued.
    pub fn publish_priority_task(&mut self, task: T) -> bool {
        self.publish(task, true)
    }

    fn publish(&mut self, task: T, priority: bool) -> bool {
        let queue = |manager: &mut Self, task: T| {
            if priority {
                manager.queued_tasks.push_front(task);
            } else {
                manager.queued_tasks.push_back(task);
            }
        };

        if !self.queued_tasks.is_empty() && !priority {
            queue(self, task);
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    queue(self, task);
                    false
                }
            },
            None => {
                queue(self, task);
                false
            }
        }
    }

    /// Moves queued tasks to workers as they become available.
    ///
    /// Should be called periodically (typically once per frame). Tasks are
    /// dispatched in queue order until the queue is empty or all workers are busy.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                }
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Collects every result the workers have finished so far.
    ///
    /// Never blocks. Results from one worker arrive in the order it processed them.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskResult<T>> {
        let mut results = Vec::new();
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                results.push(result);
            }
        }
        results
    }

    /// Number of tasks handed to workers and not yet collected.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_task_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Whether no work is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }

    /// Drops queued tasks, stops accepting work and joins every worker.
    ///
    /// Workers finish the task they are running; its result is discarded.
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        let dropped = self.queued_tasks.len();
        self.queued_tasks.clear();

        for channel in &mut self.channels {
            channel.task_sender = None;
        }

        for channel in &mut self.channels {
            if let Some(worker) = channel.worker.take() {
                if worker.join().is_err() {
                    log::error!("Task worker panicked outside of a task");
                }
            }
            while channel.result_receiver.try_recv().is_ok() {}
            channel.num_tasks_in_flight = 0;
        }

        if dropped > 0 {
            debug!("Dropped {} queued tasks on shutdown", dropped);
        }
    }
}

impl<T: Task> Drop for TaskManager<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    struct SquareTask {
        id: u32,
        cancelled: Arc<AtomicBool>,
    }

    impl Task for SquareTask {
        type Id = u32;
        type Output = u32;

        fn id(&self) -> u32 {
            self.id
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::Acquire)
        }

        fn process(&self) -> u32 {
            if self.id == 13 {
                panic!("unlucky task");
            }
            self.id * self.id
        }
    }

    fn task(id: u32) -> SquareTask {
        SquareTask {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn collect_all(manager: &mut TaskManager<SquareTask>, expected: usize) -> Vec<TaskResult<SquareTask>> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut results = Vec::new();
        while results.len() < expected && Instant::now() < deadline {
            results.extend(manager.process_completed_tasks());
            manager.process_queued_tasks();
            thread::sleep(Duration::from_millis(1));
        }
        results
    }

    #[test]
    fn test_all_tasks_complete() {
        let mut manager = TaskManager::new(3);
        for id in 0..10 {
            manager.publish_task(task(id));
        }

        let mut outputs: Vec<u32> = collect_all(&mut manager, 10)
            .into_iter()
            .map(|result| match result.outcome {
                TaskOutcome::Completed(output) => output,
                other => panic!("unexpected outcome {:?}", other),
            })
            .collect();
        outputs.sort();
        assert_eq!(outputs, (0..10).map(|id| id * id).collect::<Vec<_>>());
        assert!(manager.is_idle());
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let mut manager = TaskManager::new(1);
        manager.publish_task(task(13));
        manager.publish_task(task(2));

        let results = collect_all(&mut manager, 2);
        assert_eq!(results.len(), 2);
        for result in results {
            match (result.id, result.outcome) {
                (13, TaskOutcome::Failed(message)) => assert!(message.contains("unlucky")),
                (2, TaskOutcome::Completed(4)) => {}
                (id, outcome) => panic!("unexpected result for {}: {:?}", id, outcome),
            }
        }
    }

    #[test]
    fn test_cancelled_task_is_not_processed() {
        let mut manager = TaskManager::new(1);
        let queued = task(5);
        queued.cancelled.store(true, Ordering::Release);
        manager.publish_task(queued);

        let results = collect_all(&mut manager, 1);
        assert!(matches!(results[0].outcome, TaskOutcome::Cancelled));
    }

    #[test]
    fn test_priority_task_jumps_the_queue() {
        let mut manager: TaskManager<SquareTask> = TaskManager::new(0);
        manager.publish_task(task(1));
        manager.publish_task(task(2));
        manager.publish_priority_task(task(3));
        let order: Vec<u32> = manager.queued_tasks.iter().map(|task| task.id).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut manager = TaskManager::new(2);
        for id in 0..20 {
            manager.publish_task(task(id));
        }
        manager.shutdown();
        assert!(manager.is_idle());
        assert!(!manager.publish_task(task(1)));
    }
}
