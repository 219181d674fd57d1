use tokio::time::Instant;

use crate::job::{JobKind, JobSnapshot};
use crate::manager::types::{JobMetricsSnapshot, millis_between};

use super::JobManager;

impl JobManager {
    /// Jobs not yet removed: pending plus the one in flight. 0 after shutdown.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock_table().jobs.len()
    }

    /// Jobs matching `filter`, e.g. only script timers.
    pub fn count_matching(&self, filter: impl Fn(&JobSnapshot) -> bool) -> usize {
        let table = self.lock_table();
        table
            .jobs
            .values()
            .filter(|job| filter(&job.snapshot(self.window_id, table.running == Some(job.id()))))
            .count()
    }

    /// Smallest due time among pending, uncancelled jobs and the job in flight.
    #[must_use]
    pub fn earliest_due_at(&self) -> Option<Instant> {
        self.lock_table().earliest_due_at()
    }

    /// [`earliest_due_at`](Self::earliest_due_at) restricted to jobs matching `filter`.
    pub fn earliest_due_at_matching(
        &self,
        filter: impl Fn(&JobSnapshot) -> bool,
    ) -> Option<Instant> {
        let table = self.lock_table();
        table
            .jobs
            .values()
            .filter_map(|job| {
                let running = table.running == Some(job.id());
                if job.is_cancelled() && !running {
                    return None;
                }
                let snapshot = job.snapshot(self.window_id, running);
                filter(&snapshot).then_some(snapshot.due_at)
            })
            .min()
    }

    /// Snapshot of every job, in execution order (running job first).
    #[must_use]
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let table = self.lock_table();
        let running = table
            .running
            .and_then(|id| table.jobs.get(&id))
            .map(|job| job.snapshot(self.window_id, true));
        let pending = table
            .queue
            .iter()
            .filter_map(|(_, id)| table.jobs.get(id))
            .map(|job| job.snapshot(self.window_id, false));
        running.into_iter().chain(pending).collect()
    }

    /// Aggregate counters for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> JobMetricsSnapshot {
        let now = Instant::now();
        let window_closed = self.is_window_closed();
        let table = self.lock_table();

        let mut periodic = 0usize;
        let mut internal = 0usize;
        let mut oldest_scheduled = None::<Instant>;
        for job in table.jobs.values() {
            if job.period().is_some() {
                periodic += 1;
            }
            if job.kind() == JobKind::Internal {
                internal += 1;
            }
            let scheduled_at = job.scheduled_at();
            oldest_scheduled = Some(oldest_scheduled.map_or(scheduled_at, |v| v.min(scheduled_at)));
        }

        let overdue: Vec<Instant> = table
            .queue
            .iter()
            .map(|(due_at, _)| *due_at)
            .take_while(|due_at| *due_at <= now)
            .collect();

        JobMetricsSnapshot {
            window: self.window_id,
            window_name: self.window_name.clone(),
            total_jobs: table.jobs.len(),
            pending: table.queue.len(),
            running: usize::from(table.running.is_some()),
            periodic,
            internal,
            overdue: overdue.len(),
            max_lateness_ms: overdue.first().map(|due_at| millis_between(*due_at, now)),
            oldest_job_age_ms: oldest_scheduled.map(|at| millis_between(at, now)),
            window_closed,
            shut_down: table.shut_down,
        }
    }
}
