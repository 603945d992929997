mod local;

pub use local::{DEFAULT_RENDEZVOUS_TIMEOUT, LocalRuntime};

use specs::{Backend, RendezvousConfig};

use crate::RuntimeError;

/// The two-call lifecycle of a distributed training runtime's process group.
pub trait ProcessGroupRuntime {
    /// Joins the process group described by `config`.
    ///
    /// Collective and blocking: should only return once all `config.world_size`
    /// participants have called it, or fail.
    ///
    /// # Arguments
    /// * `backend` - The communication backend to request.
    /// * `config` - This participant's seat in the group, also exported to the environment.
    fn init_process_group(
        &mut self,
        backend: &Backend,
        config: &RendezvousConfig,
    ) -> Result<(), RuntimeError>;

    /// Leaves and destroys the current process group.
    fn destroy_process_group(&mut self) -> Result<(), RuntimeError>;
}

impl<R: ProcessGroupRuntime + ?Sized> ProcessGroupRuntime for &mut R {
    fn init_process_group(
        &mut self,
        backend: &Backend,
        config: &RendezvousConfig,
    ) -> Result<(), RuntimeError> {
        (**self).init_process_group(backend, config)
    }

    fn destroy_process_group(&mut self) -> Result<(), RuntimeError> {
        (**self).destroy_process_group()
    }
}

impl<R: ProcessGroupRuntime + ?Sized> ProcessGroupRuntime for Box<R> {
    fn init_process_group(
        &mut self,
        backend: &Backend,
        config: &RendezvousConfig,
    ) -> Result<(), RuntimeError> {
        (**self).init_process_group(backend, config)
    }

    fn destroy_process_group(&mut self) -> Result<(), RuntimeError> {
        (**self).destroy_process_group()
    }
}
