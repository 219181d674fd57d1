//! Blocking waits for cross-window quiescence.
//!
//! Both operations loop over fresh registry snapshots. A single snapshot is
//! never trusted: a callback that finishes can schedule its successor before
//! the next check, so the loop re-evaluates after every state-change event
//! (or poll tick) until the condition holds or the deadline passes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

use crate::events::JobEvent;
use crate::manager::JobManager;
use crate::registry::ManagerRegistry;

/// How a quiescence wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitOutcome {
    /// Jobs left across all registered managers.
    pub remaining: usize,
    /// The deadline passed before the condition held.
    pub timed_out: bool,
    /// Registry snapshots evaluated.
    pub passes: u64,
}

impl WaitOutcome {
    fn settled(remaining: usize, passes: u64) -> Self {
        Self {
            remaining,
            timed_out: false,
            passes,
        }
    }

    fn gave_up(remaining: usize, passes: u64) -> Self {
        Self {
            remaining,
            timed_out: true,
            passes,
        }
    }
}

/// Waits until the registered managers settle.
#[derive(Debug, Clone)]
pub struct QuiescenceWaiter {
    registry: Arc<ManagerRegistry>,
    poll_interval: Duration,
}

impl QuiescenceWaiter {
    /// Waiter over `registry`, re-checking at least every `poll_interval`.
    #[must_use]
    pub fn new(registry: Arc<ManagerRegistry>, poll_interval: Duration) -> Self {
        Self {
            registry,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Return once no job anywhere is due to start before `now + horizon`.
    ///
    /// Jobs due later still count towards the returned total. Returns 0 as
    /// soon as nothing is pending or running. With a `timeout`, gives up at
    /// the deadline and returns the current total without claiming quiescence.
    pub async fn wait_until_no_job_starts_within(
        &self,
        horizon: Duration,
        timeout: Option<Duration>,
    ) -> usize {
        self.settle_within(horizon, timeout).await.remaining
    }

    /// Return once every registered manager reports zero jobs, or at `timeout`
    /// with the current total.
    pub async fn wait_until_idle(&self, timeout: Duration) -> usize {
        self.settle_idle(timeout).await.remaining
    }

    /// [`wait_until_no_job_starts_within`](Self::wait_until_no_job_starts_within),
    /// also reporting whether the deadline cut the wait short.
    pub async fn settle_within(&self, horizon: Duration, timeout: Option<Duration>) -> WaitOutcome {
        let started = Instant::now();
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        let mut events = self.registry.subscribe();
        let mut passes = 0u64;

        loop {
            passes += 1;
            let managers = self.registry.all();
            let now = Instant::now();
            let next_due = managers
                .iter()
                .filter_map(|manager| manager.earliest_due_at())
                .min();

            let Some(next_due) = next_due else {
                self.registry.prune();
                tracing::debug!(passes, "no pending jobs");
                return WaitOutcome::settled(0, passes);
            };

            // An unrepresentable horizon end means "forever": only an empty
            // registry satisfies it.
            let quiet = now
                .checked_add(horizon)
                .is_some_and(|horizon_end| next_due >= horizon_end);
            if quiet {
                let remaining = total_count(&managers);
                self.registry.prune();
                tracing::debug!(
                    passes,
                    remaining,
                    horizon_ms = duration_millis(horizon),
                    "no job starts within horizon"
                );
                return WaitOutcome::settled(remaining, passes);
            }

            self.registry.prune();
            if deadline.is_some_and(|deadline| now >= deadline) {
                let remaining = total_count(&managers);
                tracing::warn!(
                    passes,
                    remaining,
                    horizon_ms = duration_millis(horizon),
                    waited_ms = duration_millis(now.duration_since(started)),
                    "gave up waiting for jobs within horizon"
                );
                return WaitOutcome::gave_up(remaining, passes);
            }

            self.wait_for_change(&mut events, deadline).await;
        }
    }

    /// [`wait_until_idle`](Self::wait_until_idle), also reporting whether the
    /// deadline cut the wait short.
    pub async fn settle_idle(&self, timeout: Duration) -> WaitOutcome {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        let mut events = self.registry.subscribe();
        let mut passes = 0u64;

        loop {
            passes += 1;
            let managers = self.registry.all();
            let now = Instant::now();
            let remaining = total_count(&managers);
            self.registry.prune();

            if remaining == 0 {
                tracing::debug!(passes, "all job managers idle");
                return WaitOutcome::settled(0, passes);
            }
            if deadline.is_some_and(|deadline| now >= deadline) {
                tracing::warn!(
                    passes,
                    remaining,
                    waited_ms = duration_millis(now.duration_since(started)),
                    "gave up waiting for job managers to go idle"
                );
                return WaitOutcome::gave_up(remaining, passes);
            }

            self.wait_for_change(&mut events, deadline).await;
        }
    }

    /// Sleep until any manager publishes an event, the poll interval elapses,
    /// or the deadline passes, whichever comes first.
    async fn wait_for_change(
        &self,
        events: &mut broadcast::Receiver<JobEvent>,
        deadline: Option<Instant>,
    ) {
        let now = Instant::now();
        let poll_until = now.checked_add(self.poll_interval).unwrap_or(now);
        let wake_at = deadline.map_or(poll_until, |deadline| deadline.min(poll_until));

        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => tracing::trace!(%event, "job state changed"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::trace!(skipped, "job event receiver lagged");
                }
                Err(RecvError::Closed) => tokio::time::sleep_until(wake_at).await,
            },
            () = tokio::time::sleep_until(wake_at) => {}
        }
    }
}

fn total_count(managers: &[Arc<JobManager>]) -> usize {
    managers.iter().map(|manager| manager.count()).sum()
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
