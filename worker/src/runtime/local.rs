use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use specs::{Backend, MasterEndpoint, RendezvousConfig};

use super::ProcessGroupRuntime;
use crate::RuntimeError;

/// How long a participant waits for its peers unless told otherwise.
pub const DEFAULT_RENDEZVOUS_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A rendezvous in progress, keyed by its master endpoint.
struct Session {
    world_size: usize,
    arrivals: Mutex<Arrivals>,
    ready: Condvar,
}

#[derive(Default)]
struct Arrivals {
    ranks: HashSet<usize>,
    complete: bool,
}

impl Session {
    fn new(world_size: usize, rank: usize) -> Self {
        Self {
            world_size,
            arrivals: Mutex::new(Arrivals {
                ranks: HashSet::from([rank]),
                complete: false,
            }),
            ready: Condvar::new(),
        }
    }
}

type Registry = Arc<Mutex<HashMap<MasterEndpoint, Arc<Session>>>>;

/// The membership a `LocalRuntime` holds once its group is initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Membership {
    rank: usize,
    world_size: usize,
    backend: Backend,
}

/// An in-process training runtime, every participant is a thread of the same process.
///
/// Clones share the rendezvous registry and timeout but not the membership, so each
/// participant gets its own clone. Peers meeting at the same master endpoint block until
/// all `world_size` of them arrived. A participant giving up after the timeout leaves the
/// group, and the endpoint is free again once every waiting participant left.
pub struct LocalRuntime {
    registry: Registry,
    timeout: Duration,
    membership: Option<Membership>,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_RENDEZVOUS_TIMEOUT)
    }

    /// Creates a runtime whose participants wait at most `timeout` for their peers.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            registry: Arc::default(),
            timeout,
            membership: None,
        }
    }

    /// Returns this participant's rank while its group is alive.
    pub fn rank(&self) -> Option<usize> {
        self.membership.as_ref().map(|m| m.rank)
    }

    pub fn world_size(&self) -> Option<usize> {
        self.membership.as_ref().map(|m| m.world_size)
    }

    pub fn backend(&self) -> Option<&Backend> {
        self.membership.as_ref().map(|m| &m.backend)
    }

    pub fn is_initialized(&self) -> bool {
        self.membership.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers `config.rank` in the open session for `config.master`, creating it if
    /// there is none. A rejected participant leaves the registry untouched.
    fn join(&self, config: &RendezvousConfig) -> Result<Arc<Session>, RuntimeError> {
        let mut registry = self.registry.lock();

        let open = registry
            .get(&config.master)
            .filter(|session| !session.arrivals.lock().complete);

        if let Some(session) = open {
            if session.world_size != config.world_size {
                return Err(RuntimeError::new(format!(
                    "world_size mismatch at {}: group expects {}, got {}",
                    config.master, session.world_size, config.world_size
                )));
            }

            if !session.arrivals.lock().ranks.insert(config.rank) {
                return Err(RuntimeError::new(format!(
                    "rank {} already joined the group at {}",
                    config.rank, config.master
                )));
            }

            return Ok(Arc::clone(session));
        }

        let session = Arc::new(Session::new(config.world_size, config.rank));
        registry.insert(config.master.clone(), Arc::clone(&session));
        Ok(session)
    }

    /// Blocks until the session is complete, or leaves it once the timeout elapsed.
    fn wait_for_peers(
        &self,
        session: &Arc<Session>,
        config: &RendezvousConfig,
    ) -> Result<(), RuntimeError> {
        let deadline = Instant::now().checked_add(self.timeout);
        let mut arrivals = session.arrivals.lock();

        if arrivals.ranks.len() == session.world_size {
            arrivals.complete = true;
            session.ready.notify_all();
            drop(arrivals);
            self.release(&config.master, session);
            return Ok(());
        }

        while !arrivals.complete {
            let timed_out = match deadline {
                Some(deadline) => session
                    .ready
                    .wait_until(&mut arrivals, deadline)
                    .timed_out(),
                None => {
                    session.ready.wait(&mut arrivals);
                    false
                }
            };

            if timed_out && !arrivals.complete {
                let arrived = arrivals.ranks.len();
                arrivals.ranks.remove(&config.rank);
                drop(arrivals);
                self.release(&config.master, session);

                warn!(rank = config.rank; "gave up waiting for peers at {}", config.master);
                return Err(RuntimeError::new(format!(
                    "rendezvous at {} timed out after {:?}: {arrived} of {} ranks arrived",
                    config.master, self.timeout, session.world_size
                )));
            }
        }

        Ok(())
    }

    /// Frees the endpoint if `session` is still registered there and nobody is waiting
    /// in it anymore.
    fn release(&self, master: &MasterEndpoint, session: &Arc<Session>) {
        let mut registry = self.registry.lock();
        let finished = registry.get(master).is_some_and(|s| {
            let arrivals = s.arrivals.lock();
            Arc::ptr_eq(s, session) && (arrivals.complete || arrivals.ranks.is_empty())
        });

        if finished {
            registry.remove(master);
        }
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LocalRuntime {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            timeout: self.timeout,
            membership: None,
        }
    }
}

impl ProcessGroupRuntime for LocalRuntime {
    fn init_process_group(
        &mut self,
        backend: &Backend,
        config: &RendezvousConfig,
    ) -> Result<(), RuntimeError> {
        if self.membership.is_some() {
            return Err(RuntimeError::new("process group already initialized"));
        }

        let session = self.join(config)?;

        debug!(rank = config.rank, world_size = config.world_size; "waiting for peers");
        self.wait_for_peers(&session, config)?;

        self.membership = Some(Membership {
            rank: config.rank,
            world_size: config.world_size,
            backend: backend.clone(),
        });

        Ok(())
    }

    fn destroy_process_group(&mut self) -> Result<(), RuntimeError> {
        self.membership = None;
        Ok(())
    }
}
