use std::{error::Error, fmt};

/// The orchestrator module's result type.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// All errors that can occur before any dispatch task is submitted.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before querying the scheduler.
    InvalidConfig(String),
    /// The scheduler reported no workers, nothing was submitted.
    EmptyPool,
    /// The worker pool can't host a process group.
    InvalidPool(String),
    /// The scheduler could not report its worker pool.
    Scheduler(SchedulerError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::EmptyPool => f.write_str("the scheduler has no workers to dispatch to"),
            Self::InvalidPool(msg) => write!(f, "invalid worker pool: {msg}"),
            Self::Scheduler(_) => f.write_str("could not query the scheduler"),
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scheduler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchedulerError> for OrchestratorError {
    fn from(value: SchedulerError) -> Self {
        Self::Scheduler(value)
    }
}

/// Failure reported by a scheduler client.
#[derive(Debug)]
pub struct SchedulerError {
    msg: String,
    source: Option<BoxError>,
}

impl SchedulerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            source: None,
        }
    }

    pub fn with_source(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            msg: msg.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl Error for SchedulerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Why a submitted task did not produce a value.
#[derive(Debug)]
pub enum TaskError {
    /// The scheduler refused the submission.
    Rejected(String),
    /// The task ran and failed, dispatch tasks fail with a `worker::DispatchError`.
    Failed(BoxError),
    /// The task panicked.
    Panicked(String),
    /// The task was dropped without reporting a result.
    Lost,
}

impl TaskError {
    pub fn failed(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Failed(Box::new(err))
    }

    /// Returns the task's own error as `E`, if it failed with one.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => e.downcast_ref(),
            _ => None,
        }
    }

    /// Takes the task's own error as `E`, giving `self` back if it is something else.
    pub fn downcast<E: Error + 'static>(self) -> std::result::Result<E, Self> {
        match self {
            Self::Failed(e) => e.downcast().map(|e| *e).map_err(Self::Failed),
            other => Err(other),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "task rejected: {reason}"),
            Self::Failed(_) => f.write_str("task failed"),
            Self::Panicked(msg) => write!(f, "task panicked: {msg}"),
            Self::Lost => f.write_str("task dropped before reporting a result"),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed(e) => Some(e.as_ref() as &(dyn Error + 'static)),
            _ => None,
        }
    }
}
