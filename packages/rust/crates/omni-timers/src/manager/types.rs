//! Shared types and helpers for the job manager.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::callback::JobCallback;
use crate::events::JobEventBus;
use crate::job::{Job, JobId, RunOutcome};
use crate::registry::ManagerRegistry;
use crate::sink::ErrorSink;
use crate::window::WindowId;

/// Aggregate counters for one manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobMetricsSnapshot {
    /// Owning window.
    pub window: WindowId,
    /// Window name.
    pub window_name: String,
    /// Jobs in the table (pending + running).
    pub total_jobs: usize,
    /// Jobs waiting for their due time.
    pub pending: usize,
    /// Callbacks currently executing (0 or 1).
    pub running: usize,
    /// Interval jobs.
    pub periodic: usize,
    /// Internal bookkeeping jobs.
    pub internal: usize,
    /// Pending jobs whose due time already passed.
    pub overdue: usize,
    /// How far the most overdue pending job is behind, in milliseconds.
    pub max_lateness_ms: Option<u64>,
    /// Age of the oldest job in the table, in milliseconds.
    pub oldest_job_age_ms: Option<u64>,
    /// Owning window closed or dropped.
    pub window_closed: bool,
    /// Manager shut down.
    pub shut_down: bool,
}

/// Everything a manager needs from its window and client.
pub(crate) struct ManagerWiring {
    pub(crate) window_id: WindowId,
    pub(crate) window_name: String,
    pub(crate) registry: Weak<ManagerRegistry>,
    pub(crate) events: JobEventBus,
    pub(crate) error_sink: Arc<dyn ErrorSink>,
    pub(crate) runtime: Handle,
    pub(crate) min_period: Duration,
}

/// Data needed to run one claimed job without holding the table lock.
pub(super) struct Claim {
    pub(super) due_at: Instant,
    pub(super) label: Option<String>,
    pub(super) callback: Arc<dyn JobCallback>,
}

/// Job table guarded by the manager's mutex.
///
/// `queue` indexes pending jobs by `(due_at, id)`; the running job is kept in
/// `jobs` but not in `queue`.
#[derive(Default)]
pub(super) struct JobTable {
    pub(super) jobs: HashMap<JobId, Job>,
    pub(super) queue: BTreeSet<(Instant, JobId)>,
    pub(super) running: Option<JobId>,
    pub(super) next_id: u64,
    pub(super) worker_active: bool,
    pub(super) shut_down: bool,
}

impl JobTable {
    pub(super) fn allocate_id(&mut self) -> JobId {
        self.next_id += 1;
        JobId::new(self.next_id)
    }

    pub(super) fn insert(&mut self, job: Job) {
        self.queue.insert((job.due_at(), job.id()));
        self.jobs.insert(job.id(), job);
    }

    pub(super) fn next_pending(&self) -> Option<(Instant, JobId)> {
        self.queue.first().copied()
    }

    /// Remove a pending job, or flag the running one. `false` for unknown ids
    /// and for a running job that was already cancelled.
    pub(super) fn cancel(&mut self, job_id: JobId) -> bool {
        if self.running == Some(job_id) {
            return self.jobs.get_mut(&job_id).is_some_and(Job::cancel);
        }
        match self.jobs.remove(&job_id) {
            Some(job) => {
                self.queue.remove(&(job.due_at(), job_id));
                true
            }
            None => false,
        }
    }

    pub(super) fn cancel_all(&mut self) -> Vec<JobId> {
        let ids: Vec<JobId> = self.jobs.keys().copied().collect();
        ids.into_iter().filter(|id| self.cancel(*id)).collect()
    }

    /// Mark a job as running. With `expected`, the job must still be the
    /// earliest pending entry with that exact due time.
    pub(super) fn claim(&mut self, job_id: JobId, expected: Option<Instant>) -> Option<Claim> {
        if self.shut_down || self.running.is_some() {
            return None;
        }
        let job = self.jobs.get(&job_id)?;
        if job.is_cancelled() {
            return None;
        }
        let key = (job.due_at(), job_id);
        if let Some(due_at) = expected
            && self.queue.first() != Some(&(due_at, job_id))
        {
            return None;
        }
        let claim = Claim {
            due_at: job.due_at(),
            label: job.label().map(str::to_string),
            callback: Arc::clone(job.callback()),
        };
        self.queue.remove(&key);
        self.running = Some(job_id);
        Some(claim)
    }

    /// Post-run transition. `None` when the job vanished (manager shut down).
    pub(super) fn finish(&mut self, job_id: JobId, now: Instant) -> Option<RunOutcome> {
        if self.running == Some(job_id) {
            self.running = None;
        }
        let outcome = self.jobs.get_mut(&job_id)?.finish_run(now);
        match outcome {
            RunOutcome::Rescheduled(next) => {
                self.queue.insert((next, job_id));
            }
            RunOutcome::Removed => {
                self.jobs.remove(&job_id);
            }
        }
        Some(outcome)
    }

    /// Earliest due time among pending jobs and the job in flight.
    pub(super) fn earliest_due_at(&self) -> Option<Instant> {
        let pending = self.queue.first().map(|(due_at, _)| *due_at);
        let running = self
            .running
            .and_then(|id| self.jobs.get(&id))
            .map(Job::due_at);
        pending.into_iter().chain(running).min()
    }

    pub(super) fn clear(&mut self) -> usize {
        let discarded = self.jobs.len();
        self.jobs.clear();
        self.queue.clear();
        self.running = None;
        discarded
    }
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub(super) fn millis_between(earlier: Instant, later: Instant) -> u64 {
    u64::try_from(later.saturating_duration_since(earlier).as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::callback_fn;
    use crate::job::JobSpec;

    fn table_with(now: Instant, delays_ms: &[u64]) -> (JobTable, Vec<JobId>) {
        let mut table = JobTable::default();
        let ids = delays_ms
            .iter()
            .map(|delay| {
                let id = table.allocate_id();
                let callback = callback_fn(|_ctx| async { anyhow::Ok(()) });
                table.insert(Job::new(
                    id,
                    JobSpec::once(Duration::from_millis(*delay)),
                    callback,
                    now,
                    Duration::from_millis(1),
                ));
                id
            })
            .collect();
        (table, ids)
    }

    #[test]
    fn test_cancel_removes_pending_but_only_flags_running() {
        let now = Instant::now();
        let (mut table, ids) = table_with(now, &[10, 20]);

        assert!(table.claim(ids[0], None).is_some());
        assert!(table.cancel(ids[0]));
        assert!(!table.cancel(ids[0]));
        assert!(table.cancel(ids[1]));
        assert_eq!(table.jobs.len(), 1);
        assert!(table.queue.is_empty());

        // The cancelled job in flight still counts until it finishes.
        assert_eq!(
            table.earliest_due_at(),
            Some(now + Duration::from_millis(10))
        );
        assert_eq!(
            table.finish(ids[0], now + Duration::from_millis(15)),
            Some(RunOutcome::Removed)
        );
        assert!(table.jobs.is_empty());
        assert_eq!(table.earliest_due_at(), None);
    }

    #[test]
    fn test_claim_with_expected_due_requires_queue_head() {
        let now = Instant::now();
        let (mut table, ids) = table_with(now, &[10, 20]);
        let head_due = now + Duration::from_millis(10);

        assert!(table.claim(ids[1], Some(head_due)).is_none());
        assert!(table.claim(ids[0], Some(now)).is_none());
        let claim = table.claim(ids[0], Some(head_due)).expect("claim head");
        assert_eq!(claim.due_at, head_due);
        assert_eq!(table.running, Some(ids[0]));
        // Only one job runs at a time.
        assert!(table.claim(ids[1], None).is_none());
    }

    #[test]
    fn test_clear_discards_everything() {
        let now = Instant::now();
        let (mut table, ids) = table_with(now, &[5, 5, 5]);
        assert!(table.claim(ids[0], None).is_some());
        assert_eq!(table.clear(), 3);
        assert_eq!(table.finish(ids[0], now), None);
        assert_eq!(table.next_pending(), None);
    }
}
