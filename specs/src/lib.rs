mod backend;
mod error;
mod pool;
mod rendezvous;

pub use backend::Backend;
pub use error::{Result, SpecError};
pub use pool::{WorkerAddr, WorkerInfo, WorkerPool};
pub use rendezvous::{DEFAULT_MASTER_PORT, MasterEndpoint, RendezvousConfig, env};
