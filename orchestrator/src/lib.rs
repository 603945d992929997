pub mod config;
pub mod error;
pub mod local;
pub mod ranks;
pub mod scheduler;

use std::error::Error;

use log::{debug, info};
use specs::RendezvousConfig;
use worker::{Dispatcher, Environment, ProcessGroupRuntime};

pub use config::DispatchConfig;
pub use error::{OrchestratorError, Result, SchedulerError, TaskError};
pub use local::LocalCluster;
pub use ranks::{RankAssignment, RankedWorker, assign_ranks};
pub use scheduler::{Scheduler, Task, TaskCompleter, TaskHandle, gather};

/// Dispatches `function` over every worker of the scheduler, one rank per worker.
///
/// Ranks follow the lexicographic order of the worker addresses and the rank 0
/// worker's host is the rendezvous address. Each worker receives its own clone of
/// `dispatcher`, `function` and `args` and runs them through
/// `Dispatcher::dispatch_with_ddp`, a failed task resolves to a `TaskError::Failed`
/// holding a `worker::DispatchError<E>`.
///
/// # Arguments
/// * `scheduler` - The scheduler client to query and submit to.
/// * `dispatcher` - Template for the worker side dispatcher.
/// * `function` - The training function.
/// * `args` - Forwarded untouched to every invocation of `function`.
/// * `config` - Backend, master port and local rank settings.
///
/// # Returns
/// One unresolved handle per worker, in rank order.
///
/// # Errors
/// Returns an `OrchestratorError` if the worker pool can't be obtained, is empty or
/// can't host a process group, nothing is submitted then.
pub async fn run<S, R, V, F, A, T, E>(
    scheduler: &S,
    dispatcher: Dispatcher<R, V>,
    function: F,
    args: A,
    config: &DispatchConfig,
) -> Result<Vec<TaskHandle<T>>>
where
    S: Scheduler,
    R: ProcessGroupRuntime + Clone + Send + 'static,
    V: Environment + Clone + Send + 'static,
    F: FnOnce(&RendezvousConfig, A) -> std::result::Result<T, E> + Clone + Send + 'static,
    A: Clone + Send + 'static,
    T: Send + 'static,
    E: Error + Send + Sync + 'static,
{
    let pool = scheduler.workers().await?;
    let assignment = assign_ranks(&pool)?;
    let world_size = assignment.world_size();
    let master = assignment.master(config.master_port);

    info!(world_size = world_size; "dispatching {} training to {master}", config.backend);

    let handles = assignment
        .iter()
        .map(|worker| {
            let mut rendezvous = RendezvousConfig::new(master.clone(), worker.rank, world_size)
                .with_backend(config.backend.clone());
            if config.pass_local_rank {
                rendezvous = rendezvous.with_local_rank(worker.local_rank);
            }

            let mut dispatcher = dispatcher.clone();
            let function = function.clone();
            let args = args.clone();
            let task: Task<T> = Box::new(move || {
                dispatcher
                    .dispatch_with_ddp(function, &rendezvous, args)
                    .map_err(TaskError::failed)
            });

            debug!(rank = worker.rank, local_rank = worker.local_rank; "submitting to {}", worker.addr);
            scheduler.submit(std::slice::from_ref(&worker.addr), task)
        })
        .collect();

    Ok(handles)
}
