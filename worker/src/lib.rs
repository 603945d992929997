pub mod dispatcher;
pub mod env;
pub mod error;
pub mod group;
pub mod runtime;

pub use dispatcher::{Dispatcher, dispatch_with_ddp};
pub use env::{EnvClaim, Environment, MemoryEnv, ProcessEnv};
pub use error::{DispatchError, EnvBusy, Result, RuntimeError};
pub use group::ProcessGroup;
pub use runtime::{DEFAULT_RENDEZVOUS_TIMEOUT, LocalRuntime, ProcessGroupRuntime};
