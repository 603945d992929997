use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::EnvBusy;

/// Set while a `ProcessEnv` export is alive somewhere in the process.
static PROCESS_ENV_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Destination for the rendezvous variables written before a process group is created.
pub trait Environment {
    /// Writes `vars` and reserves the environment until the returned claim is dropped.
    ///
    /// # Errors
    /// `EnvBusy` if another invocation still holds the environment, nothing is written.
    fn export(&mut self, vars: &[(&'static str, String)]) -> Result<EnvClaim, EnvBusy>;

    fn var(&self, key: &str) -> Option<String>;
}

/// Keeps an environment reserved for one invocation, released on drop.
#[derive(Debug)]
#[must_use = "the environment is released as soon as the claim is dropped"]
pub struct EnvClaim {
    flag: Option<&'static AtomicBool>,
}

impl EnvClaim {
    /// A claim over an environment nobody else writes to, releasing it does nothing.
    pub fn exclusive() -> Self {
        Self { flag: None }
    }
}

impl Drop for EnvClaim {
    fn drop(&mut self) {
        if let Some(flag) = self.flag {
            flag.store(false, Ordering::Release);
        }
    }
}

/// The real process environment.
///
/// Process-wide state: at most one export may be alive per process. A second
/// overlapping dispatch fails with `EnvBusy` instead of overwriting the first one's
/// variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    /// Returns whether some dispatch currently holds the process environment.
    pub fn is_claimed() -> bool {
        PROCESS_ENV_CLAIMED.load(Ordering::Acquire)
    }
}

impl Environment for ProcessEnv {
    fn export(&mut self, vars: &[(&'static str, String)]) -> Result<EnvClaim, EnvBusy> {
        PROCESS_ENV_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EnvBusy)?;
        let claim = EnvClaim {
            flag: Some(&PROCESS_ENV_CLAIMED),
        };

        for (key, value) in vars {
            // SAFETY: the claim above makes this the only `ProcessEnv` writer in the
            // process, the std environment lock serializes it against Rust readers.
            unsafe { std::env::set_var(key, value) }
        }

        Ok(claim)
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An isolated in-memory environment, for runtimes that take the explicit config and
/// for running several dispatchers inside one process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl Environment for MemoryEnv {
    fn export(&mut self, vars: &[(&'static str, String)]) -> Result<EnvClaim, EnvBusy> {
        for (key, value) in vars {
            self.vars.insert(key.to_string(), value.clone());
        }
        Ok(EnvClaim::exclusive())
    }

    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<V: Environment + ?Sized> Environment for &mut V {
    fn export(&mut self, vars: &[(&'static str, String)]) -> Result<EnvClaim, EnvBusy> {
        (**self).export(vars)
    }

    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}
