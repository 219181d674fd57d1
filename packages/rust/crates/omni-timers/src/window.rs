//! Window: the execution context that owns one job manager.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::callback::JobContext;
use crate::error::Result;
use crate::job::{JobId, JobSpec};
use crate::manager::{JobManager, ManagerWiring};

/// Window handle, unique within a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WindowId(u64);

impl WindowId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// A browsing context with its own serial timer queue.
///
/// Closing a window cancels its jobs but keeps the manager alive: a callback
/// already running finishes, and anything it schedules on this window still
/// runs and is still counted by the wait operations.
pub struct Window {
    id: WindowId,
    name: String,
    closed: AtomicBool,
    jobs: Arc<JobManager>,
}

impl Window {
    pub(crate) fn open(wiring: ManagerWiring) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id: wiring.window_id,
            name: wiring.window_name.clone(),
            closed: AtomicBool::new(false),
            jobs: Arc::new(JobManager::new(wiring, weak.clone())),
        })
    }

    /// Window id.
    #[must_use]
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Window name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Closed or replaced.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The window's job manager.
    #[must_use]
    pub fn job_manager(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    /// One-shot timer due after `delay`.
    pub fn set_timeout<F, Fut>(&self, delay: Duration, f: F) -> Result<JobId>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.jobs.schedule_fn(JobSpec::once(delay), f)
    }

    /// Repeating timer, first due after one `period`.
    pub fn set_interval<F, Fut>(&self, period: Duration, f: F) -> Result<JobId>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.jobs.schedule_fn(JobSpec::interval(period), f)
    }

    /// Cancel a timeout. Unknown ids are ignored.
    pub fn clear_timeout(&self, job_id: JobId) -> bool {
        self.jobs.cancel(job_id)
    }

    /// Cancel an interval. Unknown ids are ignored.
    pub fn clear_interval(&self, job_id: JobId) -> bool {
        self.jobs.cancel(job_id)
    }

    /// Mark the window closed and cancel its jobs. Returns how many were
    /// cancelled; 0 if it was already closed.
    pub fn close(&self) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let cancelled = self.jobs.cancel_all();
        self.jobs.notify_window_closed();
        tracing::debug!(
            window = %self.name,
            cancelled,
            in_flight = self.jobs.count(),
            "window closed"
        );
        cancelled
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.jobs.notify_window_closed();
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}
