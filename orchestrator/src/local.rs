use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    thread,
};

use log::debug;
use specs::{WorkerAddr, WorkerInfo, WorkerPool};

use crate::{
    error::{SchedulerError, TaskError},
    scheduler::{Scheduler, Task, TaskHandle},
};

const LOCAL_HOST: &str = "127.0.0.1";
const FIRST_WORKER_PORT: u16 = 40000;

/// A scheduler whose workers are threads of this process.
///
/// Every task gets a dedicated OS thread, never a pooled one, so a rendezvous blocking
/// all ranks of a group can't starve the ranks still waiting to start.
#[derive(Debug, Clone)]
pub struct LocalCluster {
    pool: WorkerPool,
}

impl LocalCluster {
    /// Creates a cluster of `nworkers` workers on the loopback host.
    pub fn new(nworkers: usize) -> Self {
        let pool = (0..nworkers)
            .map(|i| {
                let port = FIRST_WORKER_PORT as usize + i;
                let addr = WorkerAddr::new(format!("inproc://{LOCAL_HOST}:{port}"));
                (addr, WorkerInfo::new(LOCAL_HOST))
            })
            .collect();

        Self { pool }
    }

    /// Creates a cluster simulating the given pool.
    pub fn with_pool(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl Scheduler for LocalCluster {
    async fn workers(&self) -> Result<WorkerPool, SchedulerError> {
        Ok(self.pool.clone())
    }

    fn submit<T: Send + 'static>(&self, workers: &[WorkerAddr], task: Task<T>) -> TaskHandle<T> {
        let Some(worker) = workers.iter().find(|w| self.pool.get(w.as_str()).is_some()) else {
            return TaskHandle::rejected(format!("no known worker among {workers:?}"));
        };

        debug!("running task on {worker}");
        let (completer, handle) = TaskHandle::channel();

        let spawned = thread::Builder::new()
            .name(format!("worker {worker}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(task))
                    .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));
                completer.complete(result);
            });

        match spawned {
            Ok(_) => handle,
            Err(e) => TaskHandle::rejected(format!("could not start a thread for {worker}: {e}")),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_workers_in_port_order() {
        let cluster = LocalCluster::new(3);
        let addrs: Vec<_> = cluster.pool().iter().map(|(a, _)| a.to_string()).collect();

        assert_eq!(
            addrs,
            [
                "inproc://127.0.0.1:40000",
                "inproc://127.0.0.1:40001",
                "inproc://127.0.0.1:40002",
            ]
        );
    }

    #[tokio::test]
    async fn runs_submitted_task() {
        let cluster = LocalCluster::new(1);
        let worker = WorkerAddr::new("inproc://127.0.0.1:40000");

        let task: Task<i32> = Box::new(|| Ok(21 * 2));
        let handle = cluster.submit(&[worker], task);
        assert_eq!(handle.result().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn rejects_unknown_worker() {
        let cluster = LocalCluster::new(1);
        let worker = WorkerAddr::new("tcp://10.9.9.9:1");

        let task: Task<()> = Box::new(|| Ok(()));
        let handle = cluster.submit(&[worker], task);
        assert!(matches!(handle.result().await, Err(TaskError::Rejected(_))));
    }

    #[test]
    fn runs_without_an_async_runtime() {
        let cluster = LocalCluster::new(1);
        let worker = WorkerAddr::new("inproc://127.0.0.1:40000");

        let task: Task<String> = Box::new(|| {
            Ok(thread::current().name().unwrap_or_default().to_string())
        });
        let name = cluster.submit(&[worker], task).blocking_result().unwrap();
        assert_eq!(name, "worker inproc://127.0.0.1:40000");
    }

    #[tokio::test]
    async fn reports_panics() {
        let cluster = LocalCluster::new(1);
        let worker = WorkerAddr::new("inproc://127.0.0.1:40000");

        let task: Task<()> = Box::new(|| panic!("device lost"));
        match cluster.submit(&[worker], task).result().await {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, "device lost"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
