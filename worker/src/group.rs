use log::{debug, warn};
use specs::RendezvousConfig;

use crate::{ProcessGroupRuntime, RuntimeError};

/// A live process group, exclusively borrowing the runtime that created it.
///
/// The group is destroyed exactly once, either through `destroy` or, if the owner
/// unwinds before getting there, when the guard is dropped.
pub struct ProcessGroup<'a, R: ProcessGroupRuntime> {
    runtime: &'a mut R,
    rank: usize,
    active: bool,
}

impl<'a, R: ProcessGroupRuntime> ProcessGroup<'a, R> {
    /// Initializes a new process group, blocking until the rendezvous completes.
    ///
    /// # Arguments
    /// * `runtime` - The training runtime to initialize the group with.
    /// * `config` - This participant's seat in the group.
    ///
    /// # Returns
    /// The live group, or the runtime's error in which case there is nothing to destroy.
    pub fn init(runtime: &'a mut R, config: &RendezvousConfig) -> Result<Self, RuntimeError> {
        debug!(rank = config.rank, world_size = config.world_size; "initializing process group");
        runtime.init_process_group(&config.backend, config)?;

        Ok(Self {
            runtime,
            rank: config.rank,
            active: true,
        })
    }

    /// Destroys the process group.
    pub fn destroy(mut self) -> Result<(), RuntimeError> {
        self.active = false;
        debug!(rank = self.rank; "destroying process group");
        self.runtime.destroy_process_group()
    }
}

impl<R: ProcessGroupRuntime> Drop for ProcessGroup<'_, R> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        warn!(rank = self.rank; "process group dropped while active, destroying it");
        if let Err(e) = self.runtime.destroy_process_group() {
            warn!(rank = self.rank; "failed to destroy process group: {e}");
        }
    }
}
