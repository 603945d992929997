use std::collections::HashMap;

use specs::{MasterEndpoint, WorkerAddr, WorkerPool};

use crate::error::{OrchestratorError, Result};

/// A worker and its seat in the process group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedWorker {
    pub addr: WorkerAddr,
    pub host: String,
    pub rank: usize,
    /// Position among the workers sharing `host`, in the same address order.
    pub local_rank: usize,
}

/// Ranks for every worker of a pool snapshot, ordered by rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    workers: Vec<RankedWorker>,
}

impl RankAssignment {
    pub fn world_size(&self) -> usize {
        self.workers.len()
    }

    pub fn get(&self, rank: usize) -> Option<&RankedWorker> {
        self.workers.get(rank)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedWorker> {
        self.workers.iter()
    }

    /// The rendezvous endpoint: the rank 0 worker's host at the given port.
    pub fn master(&self, port: u16) -> MasterEndpoint {
        MasterEndpoint::new(self.workers[0].host.clone(), port)
    }
}

/// Assigns contiguous ranks following the lexicographic order of the worker addresses.
///
/// # Arguments
/// * `pool` - The worker pool snapshot.
///
/// # Returns
/// The assignment, or an error if the pool is empty or its rank 0 worker has no host.
pub fn assign_ranks(pool: &WorkerPool) -> Result<RankAssignment> {
    let mut per_host: HashMap<&str, usize> = HashMap::new();

    let workers: Vec<_> = pool
        .iter()
        .enumerate()
        .map(|(rank, (addr, info))| {
            let next = per_host.entry(info.host.as_str()).or_default();
            let local_rank = *next;
            *next += 1;

            RankedWorker {
                addr: addr.clone(),
                host: info.host.clone(),
                rank,
                local_rank,
            }
        })
        .collect();

    let Some(first) = workers.first() else {
        return Err(OrchestratorError::EmptyPool);
    };

    if first.host.trim().is_empty() {
        return Err(OrchestratorError::InvalidPool(format!(
            "rank 0 worker {} has no host to use as master address",
            first.addr
        )));
    }

    Ok(RankAssignment { workers })
}

#[cfg(test)]
mod tests {
    use specs::{DEFAULT_MASTER_PORT, WorkerInfo};

    use super::*;

    fn pool(workers: &[(&str, &str)]) -> WorkerPool {
        workers
            .iter()
            .map(|(addr, host)| (WorkerAddr::from(*addr), WorkerInfo::new(*host)))
            .collect()
    }

    #[test]
    fn ranks_follow_address_order() {
        let pool = pool(&[
            ("tcp://9.0.0.1:8786", "9.0.0.1"),
            ("tcp://10.0.0.1:8786", "10.0.0.1"),
            ("tcp://2.0.0.1:8786", "2.0.0.1"),
        ]);

        let assignment = assign_ranks(&pool).unwrap();
        let order: Vec<_> = assignment
            .iter()
            .map(|w| (w.rank, w.addr.as_str()))
            .collect();

        assert_eq!(
            order,
            [
                (0, "tcp://10.0.0.1:8786"),
                (1, "tcp://2.0.0.1:8786"),
                (2, "tcp://9.0.0.1:8786"),
            ]
        );
        assert_eq!(assignment.world_size(), 3);
    }

    #[test]
    fn master_is_rank_zero_host() {
        let pool = pool(&[
            ("tcp://b:1", "host-b"),
            ("tcp://a:1", "host-a"),
        ]);

        let master = assign_ranks(&pool).unwrap().master(DEFAULT_MASTER_PORT);
        assert_eq!(master, MasterEndpoint::new("host-a", 23456));
    }

    #[test]
    fn assignment_is_stable_across_calls() {
        let pool = pool(&[
            ("tcp://c:1", "c"),
            ("tcp://a:1", "a"),
            ("tcp://b:1", "b"),
        ]);

        assert_eq!(assign_ranks(&pool).unwrap(), assign_ranks(&pool).unwrap());
    }

    #[test]
    fn local_ranks_count_per_host() {
        let pool = pool(&[
            ("tcp://10.0.0.1:1", "node-a"),
            ("tcp://10.0.0.1:2", "node-a"),
            ("tcp://10.0.0.2:1", "node-b"),
            ("tcp://10.0.0.1:3", "node-a"),
        ]);

        let local: Vec<_> = assign_ranks(&pool)
            .unwrap()
            .iter()
            .map(|w| (w.rank, w.local_rank))
            .collect();

        assert_eq!(local, [(0, 0), (1, 1), (2, 2), (3, 0)]);
    }

    #[test]
    fn empty_pool_fails_fast() {
        assert!(matches!(
            assign_ranks(&WorkerPool::new()),
            Err(OrchestratorError::EmptyPool)
        ));
    }

    #[test]
    fn rank_zero_without_host_is_rejected() {
        let pool = pool(&[("tcp://a:1", ""), ("tcp://b:1", "b")]);
        assert!(matches!(
            assign_ranks(&pool),
            Err(OrchestratorError::InvalidPool(_))
        ));
    }
}
