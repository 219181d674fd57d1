//! Core job table and mutation path for one window.

mod metrics;
mod runtime;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::callback::{JobCallback, JobContext, callback_fn};
use crate::error::{Result, TimerError};
use crate::events::{JobEventBus, JobEventKind};
use crate::job::{Job, JobId, JobSpec};
use crate::manager::types::{JobTable, ManagerWiring};
use crate::registry::ManagerRegistry;
use crate::sink::ErrorSink;
use crate::window::{Window, WindowId};

/// Owns every job of one window and runs them, in due order, on a single worker.
///
/// All mutation goes through a short-lived mutex that is never held while a
/// callback runs, so callbacks can schedule and cancel on any manager
/// (including their own) and other threads observe the change immediately.
pub struct JobManager {
    window_id: WindowId,
    window_name: String,
    window: Weak<Window>,
    registry: Weak<ManagerRegistry>,
    events: JobEventBus,
    error_sink: Arc<dyn ErrorSink>,
    runtime: Handle,
    min_period: Duration,
    table: Mutex<JobTable>,
    wakeup: Notify,
    exec_gate: tokio::sync::Mutex<()>,
}

impl JobManager {
    pub(crate) fn new(wiring: ManagerWiring, window: Weak<Window>) -> Self {
        Self {
            window_id: wiring.window_id,
            window_name: wiring.window_name,
            window,
            registry: wiring.registry,
            events: wiring.events,
            error_sink: wiring.error_sink,
            runtime: wiring.runtime,
            min_period: wiring.min_period,
            table: Mutex::new(JobTable::default()),
            wakeup: Notify::new(),
            exec_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Schedule a job. Registers this manager with the client registry.
    ///
    /// Fails with [`TimerError::ManagerShutdown`] after [`shutdown`](Self::shutdown).
    pub fn schedule(self: &Arc<Self>, spec: JobSpec, callback: Arc<dyn JobCallback>) -> Result<JobId> {
        let now = Instant::now();
        let delay = spec.delay();
        let (job_id, spawn_worker) = {
            let mut table = self.lock_table();
            if table.shut_down {
                tracing::error!(
                    window = %self.window_name,
                    "job scheduled after job manager shutdown"
                );
                return Err(TimerError::ManagerShutdown {
                    window: self.window_name.clone(),
                });
            }
            let job_id = table.allocate_id();
            table.insert(Job::new(job_id, spec, callback, now, self.min_period));
            let spawn_worker = !table.worker_active;
            table.worker_active = true;
            (job_id, spawn_worker)
        };

        if let Some(registry) = self.registry.upgrade() {
            registry.register(self);
        }
        if spawn_worker {
            self.spawn_worker_loop();
        }
        self.wakeup.notify_one();

        tracing::trace!(
            window = %self.window_name,
            %job_id,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "job scheduled"
        );
        self.publish(Some(job_id), JobEventKind::Scheduled);
        Ok(job_id)
    }

    /// Schedule an async closure. See [`callback_fn`].
    pub fn schedule_fn<F, Fut>(self: &Arc<Self>, spec: JobSpec, f: F) -> Result<JobId>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.schedule(spec, callback_fn(f))
    }

    /// Cancel one job. A running callback is not interrupted; it only loses
    /// its reschedule. Unknown ids are a no-op returning `false`.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let cancelled = self.lock_table().cancel(job_id);
        if cancelled {
            self.wakeup.notify_one();
            tracing::trace!(window = %self.window_name, %job_id, "job cancelled");
            self.publish(Some(job_id), JobEventKind::Cancelled);
        }
        cancelled
    }

    /// Cancel every job. The worker keeps running. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.lock_table().cancel_all();
        if !cancelled.is_empty() {
            self.wakeup.notify_one();
            tracing::debug!(
                window = %self.window_name,
                cancelled = cancelled.len(),
                "cancelled all jobs"
            );
        }
        for job_id in &cancelled {
            self.publish(Some(*job_id), JobEventKind::Cancelled);
        }
        cancelled.len()
    }

    /// Stop the worker and discard all jobs. Irreversible; repeated calls are no-ops.
    ///
    /// A callback already executing runs to completion; its job is gone afterwards.
    pub fn shutdown(&self) {
        let discarded = {
            let mut table = self.lock_table();
            if table.shut_down {
                return;
            }
            table.shut_down = true;
            table.clear()
        };
        self.wakeup.notify_one();
        tracing::debug!(window = %self.window_name, discarded, "job manager shut down");
        self.publish(None, JobEventKind::ManagerShutdown);
    }

    /// `shutdown()` has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.lock_table().shut_down
    }

    /// Owning window id.
    #[must_use]
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Owning window name.
    #[must_use]
    pub fn window_name(&self) -> &str {
        &self.window_name
    }

    /// Owning window, unless dropped.
    #[must_use]
    pub fn window(&self) -> Option<Arc<Window>> {
        self.window.upgrade()
    }

    /// Owning window closed, replaced or dropped.
    #[must_use]
    pub fn is_window_closed(&self) -> bool {
        self.window.upgrade().is_none_or(|window| window.is_closed())
    }

    /// Let an idle worker notice that its window went away.
    pub(crate) fn notify_window_closed(&self) {
        self.wakeup.notify_one();
    }

    fn lock_table(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, job_id: Option<JobId>, kind: JobEventKind) {
        self.events.emit(self.window_id, job_id, kind);
    }
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("window_id", &self.window_id)
            .field("window_name", &self.window_name)
            .field("jobs", &self.count())
            .finish()
    }
}
