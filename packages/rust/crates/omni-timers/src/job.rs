//! Job: identity plus scheduling state for one registered callback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::callback::JobCallback;
use crate::window::WindowId;

/// Due-time ceiling for delays and periods that do not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Handle for one job, unique within its owning `JobManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobId(u64);

impl JobId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw sequence value. Lower values were scheduled earlier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Who a job is for: script-visible timers or internal bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Timer created through `setTimeout`/`setInterval`-style calls.
    #[default]
    Timer,
    /// Internal job that filtered counts can exclude.
    Internal,
}

/// What to schedule: delay, optional repeat period, label and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    delay: Duration,
    period: Option<Duration>,
    label: Option<String>,
    kind: JobKind,
}

impl JobSpec {
    /// One-shot job due after `delay`.
    #[must_use]
    pub fn once(delay: Duration) -> Self {
        Self {
            delay,
            period: None,
            label: None,
            kind: JobKind::Timer,
        }
    }

    /// Repeating job first due after `delay`, then every `period`.
    #[must_use]
    pub fn repeating(delay: Duration, period: Duration) -> Self {
        Self {
            period: Some(period),
            ..Self::once(delay)
        }
    }

    /// Interval job: first run after one `period`, like `setInterval`.
    #[must_use]
    pub fn interval(period: Duration) -> Self {
        Self::repeating(period, period)
    }

    /// Attach a diagnostic label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the job as internal bookkeeping.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.kind = JobKind::Internal;
        self
    }

    /// Initial delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Repeat period, if any.
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Diagnostic label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Job kind.
    #[must_use]
    pub fn kind(&self) -> JobKind {
        self.kind
    }
}

/// Point-in-time view of one job, handed to query filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    /// Job handle.
    pub id: JobId,
    /// Window whose worker runs the job.
    pub window: WindowId,
    /// Diagnostic label.
    pub label: Option<String>,
    /// Timer or internal.
    pub kind: JobKind,
    /// Next (or current, while running) due instant.
    pub due_at: Instant,
    /// Repeat period for interval jobs.
    pub period: Option<Duration>,
    /// Cancelled while running; pending jobs are removed on cancel.
    pub cancelled: bool,
    /// Callback currently executing.
    pub running: bool,
}

/// Result of `Job::finish_run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Rescheduled(Instant),
    Removed,
}

pub(crate) struct Job {
    id: JobId,
    due_at: Instant,
    period: Option<Duration>,
    label: Option<String>,
    kind: JobKind,
    callback: Arc<dyn JobCallback>,
    scheduled_at: Instant,
    cancelled: bool,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        spec: JobSpec,
        callback: Arc<dyn JobCallback>,
        now: Instant,
        min_period: Duration,
    ) -> Self {
        let due_at = now.checked_add(spec.delay).unwrap_or_else(|| far_future(now));
        Self {
            id,
            due_at,
            period: spec.period.map(|period| period.max(min_period)),
            label: spec.label,
            kind: spec.kind,
            callback,
            scheduled_at: now,
            cancelled: false,
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn due_at(&self) -> Instant {
        self.due_at
    }

    pub(crate) fn period(&self) -> Option<Duration> {
        self.period
    }

    pub(crate) fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn kind(&self) -> JobKind {
        self.kind
    }

    pub(crate) fn callback(&self) -> &Arc<dyn JobCallback> {
        &self.callback
    }

    pub(crate) fn scheduled_at(&self) -> Instant {
        self.scheduled_at
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Idempotent. Returns `true` only for the call that flipped the flag.
    pub(crate) fn cancel(&mut self) -> bool {
        !std::mem::replace(&mut self.cancelled, true)
    }

    /// Apply the post-run transition: reschedule an uncancelled interval, drop everything else.
    pub(crate) fn finish_run(&mut self, now: Instant) -> RunOutcome {
        match self.period {
            Some(period) if !self.cancelled => {
                self.due_at = next_due_after(self.due_at, period, now);
                RunOutcome::Rescheduled(self.due_at)
            }
            _ => RunOutcome::Removed,
        }
    }

    pub(crate) fn snapshot(&self, window: WindowId, running: bool) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            window,
            label: self.label.clone(),
            kind: self.kind,
            due_at: self.due_at,
            period: self.period,
            cancelled: self.cancelled,
            running,
        }
    }
}

/// `due_at + period`, skipping whole periods that already elapsed so a late
/// interval keeps its phase instead of firing a burst of catch-up runs.
fn next_due_after(due_at: Instant, period: Duration, now: Instant) -> Instant {
    let Some(next) = due_at.checked_add(period) else {
        return far_future(now);
    };
    if next >= now {
        return next;
    }
    let behind = now.duration_since(next).as_nanos();
    let period_nanos = period.as_nanos().max(1);
    let steps = behind.div_ceil(period_nanos);
    let advance = u64::try_from(steps.saturating_mul(period_nanos))
        .map_or(Duration::MAX, Duration::from_nanos);
    next.checked_add(advance).unwrap_or_else(|| far_future(now))
}

fn far_future(now: Instant) -> Instant {
    now.checked_add(FAR_FUTURE).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::callback_fn;

    fn noop() -> Arc<dyn JobCallback> {
        callback_fn(|_ctx| async { anyhow::Ok(()) })
    }

    #[test]
    fn test_job_spec_builders() {
        let spec = JobSpec::interval(Duration::from_millis(40))
            .with_label("poll")
            .internal();
        assert_eq!(spec.delay(), Duration::from_millis(40));
        assert_eq!(spec.period(), Some(Duration::from_millis(40)));
        assert_eq!(spec.label(), Some("poll"));
        assert_eq!(spec.kind(), JobKind::Internal);
        assert_eq!(JobSpec::once(Duration::ZERO).kind(), JobKind::Timer);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let now = Instant::now();
        let mut job = Job::new(
            JobId::new(1),
            JobSpec::once(Duration::from_millis(5)),
            noop(),
            now,
            Duration::from_millis(1),
        );
        assert!(job.cancel());
        assert!(!job.cancel());
        assert!(job.is_cancelled());
    }

    #[test]
    fn test_one_shot_is_removed_after_run() {
        let now = Instant::now();
        let mut job = Job::new(
            JobId::new(1),
            JobSpec::once(Duration::from_millis(5)),
            noop(),
            now,
            Duration::from_millis(1),
        );
        assert_eq!(job.finish_run(now), RunOutcome::Removed);
    }

    #[test]
    fn test_interval_reschedules_from_due_time() {
        let now = Instant::now();
        let period = Duration::from_millis(100);
        let mut job = Job::new(
            JobId::new(1),
            JobSpec::interval(period),
            noop(),
            now,
            Duration::from_millis(1),
        );
        let first_due = job.due_at();
        // Ran a little late; the next due time stays on the original grid.
        let outcome = job.finish_run(first_due + Duration::from_millis(30));
        assert_eq!(outcome, RunOutcome::Rescheduled(first_due + period));
    }

    #[test]
    fn test_overrun_interval_skips_missed_periods() {
        let now = Instant::now();
        let period = Duration::from_millis(100);
        let mut job = Job::new(
            JobId::new(1),
            JobSpec::interval(period),
            noop(),
            now,
            Duration::from_millis(1),
        );
        let first_due = job.due_at();
        let outcome = job.finish_run(first_due + Duration::from_millis(350));
        assert_eq!(
            outcome,
            RunOutcome::Rescheduled(first_due + Duration::from_millis(400))
        );
    }

    #[test]
    fn test_cancelled_interval_is_removed() {
        let now = Instant::now();
        let mut job = Job::new(
            JobId::new(1),
            JobSpec::interval(Duration::from_millis(10)),
            noop(),
            now,
            Duration::from_millis(1),
        );
        job.cancel();
        assert_eq!(job.finish_run(now), RunOutcome::Removed);
    }

    #[test]
    fn test_zero_period_is_clamped() {
        let now = Instant::now();
        let job = Job::new(
            JobId::new(1),
            JobSpec::repeating(Duration::ZERO, Duration::ZERO),
            noop(),
            now,
            Duration::from_millis(1),
        );
        assert_eq!(job.period(), Some(Duration::from_millis(1)));
        assert_eq!(job.due_at(), now);
    }

    #[test]
    fn test_unrepresentable_delay_saturates_to_far_future() {
        let now = Instant::now();
        let job = Job::new(
            JobId::new(1),
            JobSpec::once(Duration::MAX),
            noop(),
            now,
            Duration::from_millis(1),
        );
        assert_eq!(job.due_at(), now + FAR_FUTURE);
    }

    #[test]
    fn test_unrepresentable_period_saturates_to_far_future() {
        let now = Instant::now();
        let mut job = Job::new(
            JobId::new(1),
            JobSpec::repeating(Duration::from_millis(10), Duration::MAX),
            noop(),
            now,
            Duration::from_millis(1),
        );
        let ran_at = job.due_at();
        assert_eq!(
            job.finish_run(ran_at),
            RunOutcome::Rescheduled(ran_at + FAR_FUTURE)
        );
        assert!(job.due_at() > ran_at);
    }
}
