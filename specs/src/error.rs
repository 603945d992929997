use std::{error::Error, fmt};

/// The specs module's result type.
pub type Result<T> = std::result::Result<T, SpecError>;

/// Errors raised while building or validating the shared dispatch specs.
#[derive(Debug)]
pub enum SpecError {
    /// A rendezvous configuration violates its invariants.
    InvalidRendezvous(String),
    /// The backend name is empty.
    InvalidBackend(String),
    /// The scheduler info document could not be parsed.
    SchedulerInfo(serde_json::Error),
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRendezvous(msg) => write!(f, "invalid rendezvous config: {msg}"),
            Self::InvalidBackend(name) => write!(f, "invalid backend name: {name:?}"),
            Self::SchedulerInfo(_) => f.write_str("malformed scheduler info"),
        }
    }
}

impl Error for SpecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchedulerInfo(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SpecError {
    fn from(value: serde_json::Error) -> Self {
        Self::SchedulerInfo(value)
    }
}
