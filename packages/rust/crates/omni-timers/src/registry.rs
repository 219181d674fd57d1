//! Client-wide registry of job managers, including closed windows with unfinished work.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::events::{JobEvent, JobEventBus};
use crate::manager::{JobManager, JobMetricsSnapshot};

/// Every manager that has scheduled a job and may still hold work.
///
/// A manager leaves only through [`prune`](Self::prune), once its window is
/// closed and it reports zero jobs. A window closed while one of its callbacks
/// is running therefore stays visible until that callback and everything it
/// scheduled on the same manager have finished.
#[derive(Debug)]
pub struct ManagerRegistry {
    managers: Mutex<Vec<Arc<JobManager>>>,
    events: JobEventBus,
}

impl ManagerRegistry {
    /// Empty registry publishing on `events`.
    #[must_use]
    pub fn new(events: JobEventBus) -> Self {
        Self {
            managers: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Add `manager` unless already present. Returns `true` if it was added.
    pub fn register(&self, manager: &Arc<JobManager>) -> bool {
        let mut managers = self.lock_managers();
        if managers.iter().any(|known| Arc::ptr_eq(known, manager)) {
            return false;
        }
        managers.push(Arc::clone(manager));
        tracing::debug!(
            window = %manager.window_name(),
            registered = managers.len(),
            "job manager registered"
        );
        true
    }

    /// Snapshot of the current membership.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<JobManager>> {
        self.lock_managers().clone()
    }

    /// Drop managers whose window is closed and which hold no jobs.
    /// Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut managers = self.lock_managers();
        let before = managers.len();
        managers.retain(|manager| !(manager.is_window_closed() && manager.count() == 0));
        let pruned = before - managers.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = managers.len(), "pruned job managers");
        }
        pruned
    }

    /// Sum of `count()` over all managers.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.all().iter().map(|manager| manager.count()).sum()
    }

    /// Minimum of `earliest_due_at()` over all managers.
    #[must_use]
    pub fn earliest_due_at(&self) -> Option<Instant> {
        self.all()
            .iter()
            .filter_map(|manager| manager.earliest_due_at())
            .min()
    }

    /// Per-manager metrics.
    #[must_use]
    pub fn metrics(&self) -> Vec<JobMetricsSnapshot> {
        self.all().iter().map(|manager| manager.metrics()).collect()
    }

    /// Receiver for state-change events of every manager.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Event bus shared with the managers.
    #[must_use]
    pub fn events(&self) -> &JobEventBus {
        &self.events
    }

    /// Registered manager count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_managers().len()
    }

    /// No managers registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every manager.
    pub fn clear(&self) -> Vec<Arc<JobManager>> {
        std::mem::take(&mut *self.lock_managers())
    }

    fn lock_managers(&self) -> MutexGuard<'_, Vec<Arc<JobManager>>> {
        self.managers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
