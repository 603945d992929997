use serde::{Deserialize, Serialize};
use specs::{Backend, DEFAULT_MASTER_PORT};

use crate::error::{OrchestratorError, Result};

const BACKEND_VAR: &str = "DDP_BACKEND";
const MASTER_PORT_VAR: &str = "DDP_MASTER_PORT";
const PASS_LOCAL_RANK_VAR: &str = "DDP_PASS_LOCAL_RANK";

/// Driver-side settings shared by every task of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Communication backend every worker requests.
    pub backend: Backend,
    /// Port of the rendezvous endpoint on the rank 0 host.
    pub master_port: u16,
    /// Whether workers also receive their rank among the workers of the same host.
    pub pass_local_rank: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Nccl,
            master_port: DEFAULT_MASTER_PORT,
            pass_local_rank: false,
        }
    }
}

impl DispatchConfig {
    /// Builds the config from the defaults, overridden by `DDP_BACKEND`,
    /// `DDP_MASTER_PORT` and `DDP_PASS_LOCAL_RANK` when set.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if any of the set variables can't be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(backend) = lookup(BACKEND_VAR) {
            config.backend = backend
                .parse()
                .map_err(|e| OrchestratorError::InvalidConfig(format!("{BACKEND_VAR}: {e}")))?;
        }

        if let Some(port) = lookup(MASTER_PORT_VAR) {
            config.master_port = port.trim().parse().map_err(|e| {
                OrchestratorError::InvalidConfig(format!("{MASTER_PORT_VAR}={port:?}: {e}"))
            })?;
        }

        if let Some(flag) = lookup(PASS_LOCAL_RANK_VAR) {
            config.pass_local_rank = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(OrchestratorError::InvalidConfig(format!(
                        "{PASS_LOCAL_RANK_VAR}={flag:?}: expected a boolean"
                    )));
                }
            };
        }

        Ok(config)
    }
}
