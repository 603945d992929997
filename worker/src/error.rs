use std::{error::Error, fmt};

use specs::SpecError;

/// The worker module's result type, `E` is the training function's error type.
pub type Result<T, E> = std::result::Result<T, DispatchError<E>>;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Failure reported by a training runtime while creating or tearing down a process group.
#[derive(Debug)]
pub struct RuntimeError {
    msg: String,
    source: Option<BoxError>,
}

impl RuntimeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            source: None,
        }
    }

    /// Creates a `RuntimeError` that keeps the runtime's own error as its source.
    pub fn with_source(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            msg: msg.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// The process environment is held by another invocation in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvBusy;

impl fmt::Display for EnvBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("another dispatch holds the process environment")
    }
}

impl Error for EnvBusy {}

/// Worker dispatch failures.
///
/// `Display` only names the failed step, the underlying error is its `source`.
///
/// A training error is always reported as `Training`, even when the teardown that
/// follows it fails as well.
#[derive(Debug)]
pub enum DispatchError<E> {
    /// The rendezvous config was rejected before anything was touched.
    InvalidConfig(SpecError),
    /// The environment is in use by an overlapping dispatch, nothing was exported.
    EnvironmentBusy(EnvBusy),
    /// The process group could not be initialized, no teardown was needed.
    Rendezvous(RuntimeError),
    /// The training function failed, the process group was torn down afterwards.
    Training(E),
    /// The training function succeeded but the process group could not be destroyed.
    Teardown(RuntimeError),
}

impl<E> DispatchError<E> {
    /// Returns the training function's error, if that is what failed.
    pub fn into_training(self) -> Option<E> {
        match self {
            Self::Training(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> fmt::Display for DispatchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(_) => f.write_str("config rejected before dispatch"),
            Self::EnvironmentBusy(_) => f.write_str("could not export rendezvous variables"),
            Self::Rendezvous(_) => f.write_str("process group initialization failed"),
            Self::Training(_) => f.write_str("training function failed"),
            Self::Teardown(_) => f.write_str("process group teardown failed"),
        }
    }
}

impl<E: Error + 'static> Error for DispatchError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            Self::EnvironmentBusy(e) => Some(e),
            Self::Rendezvous(e) | Self::Teardown(e) => Some(e),
            Self::Training(e) => Some(e),
        }
    }
}

impl<E> From<SpecError> for DispatchError<E> {
    fn from(value: SpecError) -> Self {
        Self::InvalidConfig(value)
    }
}

impl<E> From<EnvBusy> for DispatchError<E> {
    fn from(value: EnvBusy) -> Self {
        Self::EnvironmentBusy(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders `err` followed by its source chain, the way error reporters do.
    fn report(err: &dyn Error) -> String {
        let mut out = err.to_string();
        let mut source = err.source();
        while let Some(e) = source {
            out.push_str(": ");
            out.push_str(&e.to_string());
            source = e.source();
        }
        out
    }

    #[test]
    fn invalid_config_is_reported_once() {
        let err = DispatchError::<EnvBusy>::InvalidConfig(SpecError::InvalidRendezvous(
            "rank 2 out of range for world_size 2".to_string(),
        ));

        let rendered = report(&err);
        assert_eq!(rendered.matches("rank 2 out of range").count(), 1);
        assert_eq!(
            rendered,
            "config rejected before dispatch: invalid rendezvous config: \
             rank 2 out of range for world_size 2"
        );
    }

    #[test]
    fn runtime_source_is_reported_once() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address already in use");
        let err = DispatchError::<EnvBusy>::Rendezvous(RuntimeError::with_source(
            "failed to bind the store",
            io,
        ));

        assert_eq!(
            report(&err),
            "process group initialization failed: failed to bind the store: address already in use"
        );
    }
}
