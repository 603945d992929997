use log::{debug, info, warn};
use specs::RendezvousConfig;

use crate::{DispatchError, Environment, ProcessEnv, ProcessGroup, ProcessGroupRuntime, Result};

/// Runs training functions inside a freshly created process group.
///
/// Owns the runtime and the environment the rendezvous variables are written to, and
/// takes `&mut self` per invocation so a dispatcher never runs two groups at once.
#[derive(Debug, Clone)]
pub struct Dispatcher<R, V = ProcessEnv> {
    runtime: R,
    env: V,
}

impl<R: ProcessGroupRuntime> Dispatcher<R> {
    /// Creates a dispatcher exporting to the real process environment.
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            env: ProcessEnv,
        }
    }
}

impl<R, V> Dispatcher<R, V> {
    /// Creates a dispatcher exporting to the given environment.
    pub fn with_env(runtime: R, env: V) -> Self {
        Self { runtime, env }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn env(&self) -> &V {
        &self.env
    }

    pub fn into_parts(self) -> (R, V) {
        (self.runtime, self.env)
    }
}

impl<R: ProcessGroupRuntime, V: Environment> Dispatcher<R, V> {
    /// Runs `function` once inside a process group described by `config`.
    ///
    /// The rendezvous variables are exported first, then the group is initialized, the
    /// function called with `args` and the group destroyed whatever the outcome. A panic
    /// in `function` still destroys the group before unwinding further. The environment
    /// stays claimed for the whole invocation, so overlapping `ProcessEnv` dispatches in
    /// one process fail instead of overwriting each other's variables.
    ///
    /// # Arguments
    /// * `function` - The training function, receives the config and the forwarded args.
    /// * `config` - This worker's seat in the process group.
    /// * `args` - Forwarded untouched to `function`.
    ///
    /// # Returns
    /// The function's output.
    ///
    /// # Errors
    /// * `InvalidConfig` - The config is invalid, nothing was exported.
    /// * `EnvironmentBusy` - Another dispatch still holds the environment, nothing was
    ///   exported.
    /// * `Rendezvous` - The group could not be initialized, the function was not called.
    /// * `Training` - The function failed, reported even if the teardown failed too.
    /// * `Teardown` - The function succeeded but the group could not be destroyed.
    pub fn dispatch_with_ddp<F, A, T, E>(
        &mut self,
        function: F,
        config: &RendezvousConfig,
        args: A,
    ) -> Result<T, E>
    where
        F: FnOnce(&RendezvousConfig, A) -> std::result::Result<T, E>,
    {
        config.validate()?;

        // Held until the group is gone, dropped after it even when unwinding.
        let _claim = self.env.export(&config.env_vars())?;
        debug!(rank = config.rank; "exported rendezvous variables for {}", config.master);

        let group =
            ProcessGroup::init(&mut self.runtime, config).map_err(DispatchError::Rendezvous)?;
        info!(
            rank = config.rank,
            world_size = config.world_size;
            "joined {} process group",
            config.backend
        );

        let output = function(config, args);

        match (output, group.destroy()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(DispatchError::Teardown(e)),
            (Err(e), Ok(())) => Err(DispatchError::Training(e)),
            (Err(e), Err(teardown)) => {
                warn!(rank = config.rank; "teardown failed after training error: {teardown}");
                Err(DispatchError::Training(e))
            }
        }
    }
}

/// Runs `function` once inside a process group, exporting to the process environment.
///
/// Only one such call may be in flight per process, see `Dispatcher::dispatch_with_ddp`.
pub fn dispatch_with_ddp<R, F, A, T, E>(
    runtime: &mut R,
    function: F,
    config: &RendezvousConfig,
    args: A,
) -> Result<T, E>
where
    R: ProcessGroupRuntime + ?Sized,
    F: FnOnce(&RendezvousConfig, A) -> std::result::Result<T, E>,
{
    Dispatcher::new(runtime).dispatch_with_ddp(function, config, args)
}
