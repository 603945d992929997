use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Backend, Result, SpecError};

/// Port every participant connects to when no override is configured.
pub const DEFAULT_MASTER_PORT: u16 = 23456;

/// Names of the environment variables read by torch-style training runtimes.
pub mod env {
    pub const MASTER_ADDR: &str = "MASTER_ADDR";
    pub const MASTER_PORT: &str = "MASTER_PORT";
    pub const RANK: &str = "RANK";
    pub const WORLD_SIZE: &str = "WORLD_SIZE";
    pub const LOCAL_RANK: &str = "LOCAL_RANK";
}

/// The address and port all participants meet at during rendezvous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MasterEndpoint {
    pub addr: String,
    pub port: u16,
}

impl MasterEndpoint {
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
        }
    }
}

impl fmt::Display for MasterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Everything a single participant needs to join a process group.
///
/// Handed to the runtime's init call as is, and rendered into environment
/// variables for runtimes that only read those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendezvousConfig {
    pub master: MasterEndpoint,
    pub rank: usize,
    pub world_size: usize,
    /// Position among the participants sharing this host, only set when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_rank: Option<usize>,
    #[serde(default)]
    pub backend: Backend,
}

impl RendezvousConfig {
    /// Creates a new `RendezvousConfig` using the default backend and no local rank.
    ///
    /// # Arguments
    /// * `master` - The rendezvous endpoint.
    /// * `rank` - This participant's rank.
    /// * `world_size` - The total amount of participants.
    pub fn new(master: MasterEndpoint, rank: usize, world_size: usize) -> Self {
        Self {
            master,
            rank,
            world_size,
            local_rank: None,
            backend: Backend::default(),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_local_rank(mut self, local_rank: usize) -> Self {
        self.local_rank = Some(local_rank);
        self
    }

    /// Checks the config describes a valid seat in a process group.
    ///
    /// # Returns
    /// An error if the master address is empty, the world is empty or any rank falls
    /// outside of `[0, world_size)`.
    pub fn validate(&self) -> Result<()> {
        if self.master.addr.trim().is_empty() {
            return Err(SpecError::InvalidRendezvous(
                "master address must not be empty".into(),
            ));
        }

        if self.world_size == 0 {
            return Err(SpecError::InvalidRendezvous(
                "world_size must be greater than 0".into(),
            ));
        }

        if self.rank >= self.world_size {
            return Err(SpecError::InvalidRendezvous(format!(
                "rank ({}) must be lower than world_size ({})",
                self.rank, self.world_size
            )));
        }

        if let Some(local_rank) = self.local_rank.filter(|&lr| lr >= self.world_size) {
            return Err(SpecError::InvalidRendezvous(format!(
                "local_rank ({local_rank}) must be lower than world_size ({})",
                self.world_size
            )));
        }

        Ok(())
    }

    /// Renders the config as the string-typed environment variables the runtime reads.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (env::MASTER_ADDR, self.master.addr.clone()),
            (env::MASTER_PORT, self.master.port.to_string()),
            (env::RANK, self.rank.to_string()),
            (env::WORLD_SIZE, self.world_size.to_string()),
        ];

        if let Some(local_rank) = self.local_rank {
            vars.push((env::LOCAL_RANK, local_rank.to_string()));
        }

        vars
    }
}
