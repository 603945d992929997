//! Launches a distributed training function over the workers of a task scheduler.
//!
//! The driver side lives in [`orchestrator`]: it ranks the scheduler's workers and
//! submits one task per worker. The worker side lives in [`worker`]: it exports the
//! rendezvous variables, joins the process group, runs the training function and
//! always tears the group down.

pub use orchestrator::{
    self, DispatchConfig, LocalCluster, OrchestratorError, Scheduler, TaskError, TaskHandle,
    assign_ranks, gather, run,
};
pub use specs::{
    self, Backend, DEFAULT_MASTER_PORT, MasterEndpoint, RendezvousConfig, WorkerAddr, WorkerInfo,
    WorkerPool,
};
pub use worker::{
    self, DispatchError, Dispatcher, LocalRuntime, ProcessGroupRuntime, dispatch_with_ddp,
};
