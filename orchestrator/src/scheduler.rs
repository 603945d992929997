use futures::future;
use specs::{WorkerAddr, WorkerPool};
use tokio::sync::oneshot;

use crate::error::{SchedulerError, TaskError};

/// A unit of work shipped to a worker.
pub type Task<T> = Box<dyn FnOnce() -> Result<T, TaskError> + Send + 'static>;

/// Client side of a distributed task scheduler.
#[allow(unused)]
#[trait_variant::make(Scheduler: Send)]
pub trait SchedulerTemplate {
    /// Returns a snapshot of the workers currently available.
    async fn workers(&self) -> Result<WorkerPool, SchedulerError>;

    /// Submits `task` for execution on one of `workers`, without waiting for it.
    ///
    /// A refused submission must be reported through the returned handle, see
    /// `TaskHandle::rejected`, so it never affects other submissions.
    ///
    /// # Arguments
    /// * `workers` - The workers allowed to run the task.
    /// * `task` - The work to run.
    fn submit<T: Send + 'static>(&self, workers: &[WorkerAddr], task: Task<T>) -> TaskHandle<T>;
}

/// Resolves to the result of a submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

/// The scheduler's end of a `TaskHandle`, reports the task's result.
#[derive(Debug)]
pub struct TaskCompleter<T> {
    tx: oneshot::Sender<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Creates a pending handle along with the completer that resolves it.
    pub fn channel() -> (TaskCompleter<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (TaskCompleter { tx }, Self { rx })
    }

    /// Creates a handle already resolved to a refused submission.
    pub fn rejected(reason: impl Into<String>) -> Self {
        let (completer, handle) = Self::channel();
        completer.complete(Err(TaskError::Rejected(reason.into())));
        handle
    }

    /// Waits for the task's result.
    pub async fn result(self) -> Result<T, TaskError> {
        self.rx.await.unwrap_or(Err(TaskError::Lost))
    }

    /// Blocks the current thread until the task's result arrives.
    ///
    /// Must not be called from within an async context.
    pub fn blocking_result(self) -> Result<T, TaskError> {
        self.rx.blocking_recv().unwrap_or(Err(TaskError::Lost))
    }
}

impl<T> TaskCompleter<T> {
    pub fn complete(self, result: Result<T, TaskError>) {
        // The handle may have been dropped, nobody is waiting then.
        let _ = self.tx.send(result);
    }
}

/// Waits for every handle, returning the values in the handles' order.
///
/// # Errors
/// The first task error observed.
pub async fn gather<T>(handles: Vec<TaskHandle<T>>) -> Result<Vec<T>, TaskError> {
    future::try_join_all(handles.into_iter().map(TaskHandle::result)).await
}
