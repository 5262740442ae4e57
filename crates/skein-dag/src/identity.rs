//! Lineage run ids, minted once per (DAG run, task) and shared by both hooks.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use skein_types::StepMetadata;
use uuid::Uuid;

use crate::schedule::NominalWindow;

/// Produces lineage run ids.
pub type RunIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Default generator: a random (version 4) UUID.
pub fn uuid_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// What the pre-run hook learned about one task of one DAG run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIdentity {
    pub dag_run_id: String,
    pub task_id: String,
    pub lineage_run_id: String,
    pub window: NominalWindow,
    /// Metadata extracted before the task ran.
    pub pre_run: Vec<StepMetadata>,
    /// Set once the run has been marked completed or failed.
    pub finalized: bool,
}

/// Outcome of [`RunIdentityStore::get_or_mint`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minted {
    pub identity: RunIdentity,
    /// False when an existing id was reused.
    pub fresh: bool,
}

/// Number of closed DAG runs remembered, oldest forgotten first.
pub const CLOSED_RUN_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Identities {
    runs: HashMap<String, HashMap<String, RunIdentity>>,
    closed: HashSet<String>,
    closed_order: VecDeque<String>,
}

impl Identities {
    /// Drop the run's identities once every task is terminal.
    fn close_if_done(&mut self, dag_run_id: &str) {
        let done = self
            .runs
            .get(dag_run_id)
            .is_some_and(|tasks| tasks.values().all(|identity| identity.finalized));
        if !done {
            return;
        }
        self.runs.remove(dag_run_id);
        if self.closed.insert(dag_run_id.to_string()) {
            self.closed_order.push_back(dag_run_id.to_string());
        }
        while self.closed_order.len() > CLOSED_RUN_CAPACITY {
            if let Some(oldest) = self.closed_order.pop_front() {
                self.closed.remove(&oldest);
            }
        }
    }
}

/// Run identities keyed by DAG run id, then task id.
///
/// Lookups and insertions for a key happen under one lock, so an id is never
/// minted twice for the same key and a task's run is finalized at most once.
/// A DAG run whose tasks are all terminal is closed: its identities are
/// dropped and only its id is remembered.
#[derive(Debug, Default)]
pub struct RunIdentityStore {
    inner: Mutex<Identities>,
}

impl RunIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the identity for `(dag_run_id, task_id)`, minting one with
    /// `mint` if none exists. On reuse of a pending identity the window and
    /// pre-run metadata are refreshed; the id never changes.
    ///
    /// Returns `None` for a closed DAG run.
    pub fn get_or_mint(
        &self,
        dag_run_id: &str,
        task_id: &str,
        window: NominalWindow,
        pre_run: Vec<StepMetadata>,
        mint: impl FnOnce() -> String,
    ) -> Option<Minted> {
        let mut inner = self.inner.lock();
        if inner.closed.contains(dag_run_id) {
            return None;
        }
        let tasks = inner.runs.entry(dag_run_id.to_string()).or_default();

        if let Some(identity) = tasks.get_mut(task_id) {
            if !identity.finalized {
                identity.window = window;
                identity.pre_run = pre_run;
            }
            return Some(Minted {
                identity: identity.clone(),
                fresh: false,
            });
        }

        let identity = RunIdentity {
            dag_run_id: dag_run_id.to_string(),
            task_id: task_id.to_string(),
            lineage_run_id: mint(),
            window,
            pre_run,
            finalized: false,
        };
        tasks.insert(task_id.to_string(), identity.clone());
        Some(Minted {
            identity,
            fresh: true,
        })
    }

    pub fn get(&self, dag_run_id: &str, task_id: &str) -> Option<RunIdentity> {
        self.inner
            .lock()
            .runs
            .get(dag_run_id)
            .and_then(|tasks| tasks.get(task_id))
            .cloned()
    }

    /// Claim the task's run for its terminal update.
    ///
    /// Returns the identity to the one caller that claims it, and `None` if it
    /// is unknown or was already claimed. Closes the DAG run once every task
    /// is terminal.
    pub fn finalize(&self, dag_run_id: &str, task_id: &str) -> Option<RunIdentity> {
        let mut inner = self.inner.lock();
        let identity = inner
            .runs
            .get_mut(dag_run_id)
            .and_then(|tasks| tasks.get_mut(task_id))
            .filter(|identity| !identity.finalized)?;
        identity.finalized = true;
        let claimed = identity.clone();
        inner.close_if_done(dag_run_id);
        Some(claimed)
    }

    /// Mark a task that never started as terminal without reporting it.
    /// Returns false if it was unknown or already terminal.
    pub fn retire(&self, dag_run_id: &str, task_id: &str) -> bool {
        self.finalize(dag_run_id, task_id).is_some()
    }

    /// Whether every task of the DAG run has been finalized or retired.
    pub fn is_closed(&self, dag_run_id: &str) -> bool {
        self.inner.lock().closed.contains(dag_run_id)
    }

    /// Number of DAG runs with identities in flight.
    pub fn active_runs(&self) -> usize {
        self.inner.lock().runs.len()
    }
}
