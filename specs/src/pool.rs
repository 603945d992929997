use std::{borrow::Borrow, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Opaque identifier the scheduler uses for a worker, e.g. `tcp://10.0.0.3:8786`.
///
/// Ordering is plain lexicographic ordering over the address string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerAddr(String);

impl WorkerAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerAddr {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WorkerAddr {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for WorkerAddr {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Metadata the scheduler reports for a single worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    /// Host name or ip the worker runs on, used as the rendezvous address when the
    /// worker holds rank 0.
    pub host: String,
    /// Any other field reported by the scheduler, kept untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerInfo {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            extra: Map::new(),
        }
    }
}

/// Read-only snapshot of the workers currently known to the scheduler.
///
/// Workers are always iterated in lexicographic address order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerPool {
    workers: BTreeMap<WorkerAddr, WorkerInfo>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a scheduler info document, only its `workers` table is read.
    ///
    /// # Arguments
    /// * `json` - A document shaped like `{"workers": {"tcp://..": {"host": ".."}}}`.
    ///
    /// # Returns
    /// The pool snapshot or an error if the document is malformed.
    pub fn from_scheduler_info(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adds or replaces a worker, returning the previous metadata if any.
    pub fn insert(&mut self, addr: impl Into<WorkerAddr>, info: WorkerInfo) -> Option<WorkerInfo> {
        self.workers.insert(addr.into(), info)
    }

    pub fn get(&self, addr: &str) -> Option<&WorkerInfo> {
        self.workers.get(addr)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Iterates the workers in lexicographic address order.
    pub fn iter(&self) -> impl Iterator<Item = (&WorkerAddr, &WorkerInfo)> {
        self.workers.iter()
    }
}

impl FromIterator<(WorkerAddr, WorkerInfo)> for WorkerPool {
    fn from_iter<I: IntoIterator<Item = (WorkerAddr, WorkerInfo)>>(iter: I) -> Self {
        Self {
            workers: iter.into_iter().collect(),
        }
    }
}
