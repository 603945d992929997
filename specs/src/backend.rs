use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::SpecError;

/// Collective communication backend requested from the training runtime.
///
/// Names are matched case-insensitively and serialized in lowercase, anything
/// unrecognized is carried verbatim in `Other` and left for the runtime to judge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    #[default]
    Nccl,
    Gloo,
    Mpi,
    Other(String),
}

impl Backend {
    /// Returns the name the training runtime expects for this backend.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Nccl => "nccl",
            Self::Gloo => "gloo",
            Self::Mpi => "mpi",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(SpecError::InvalidBackend(s.to_string()));
        }

        Ok(match name.to_ascii_lowercase().as_str() {
            "nccl" => Self::Nccl,
            "gloo" => Self::Gloo,
            "mpi" => Self::Mpi,
            other => Self::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for Backend {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Backend> for String {
    fn from(value: Backend) -> Self {
        value.as_str().to_string()
    }
}
