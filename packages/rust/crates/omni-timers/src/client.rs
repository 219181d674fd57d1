//! Timer client: owns windows, the manager registry and the event bus.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::config::TimerConfig;
use crate::error::{Result, TimerError};
use crate::events::{JobEvent, JobEventBus};
use crate::manager::{JobMetricsSnapshot, ManagerWiring};
use crate::registry::ManagerRegistry;
use crate::sink::{ErrorSink, TracingErrorSink};
use crate::waiter::{QuiescenceWaiter, WaitOutcome};
use crate::window::{Window, WindowId};

/// Entry point: open windows, schedule through them, wait for them to settle.
pub struct TimerClient {
    config: TimerConfig,
    registry: Arc<ManagerRegistry>,
    error_sink: Arc<dyn ErrorSink>,
    windows: Mutex<Vec<Arc<Window>>>,
    next_window_id: AtomicU64,
    shut_down: AtomicBool,
}

impl TimerClient {
    /// Client logging callback failures through `tracing`.
    #[must_use]
    pub fn new(config: TimerConfig) -> Self {
        Self::with_error_sink(config, Arc::new(TracingErrorSink))
    }

    /// Client reporting callback failures to `error_sink`.
    #[must_use]
    pub fn with_error_sink(config: TimerConfig, error_sink: Arc<dyn ErrorSink>) -> Self {
        let events = JobEventBus::new(config.event_capacity);
        Self {
            config,
            registry: Arc::new(ManagerRegistry::new(events)),
            error_sink,
            windows: Mutex::new(Vec::new()),
            next_window_id: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Open a window. Its worker runs on the current tokio runtime.
    pub fn open_window(&self, name: &str) -> Result<Arc<Window>> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TimerError::ClientShutdown);
        }
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let window_id = WindowId::new(self.next_window_id.fetch_add(1, Ordering::Relaxed) + 1);
        let window = Window::open(ManagerWiring {
            window_id,
            window_name: name.to_string(),
            registry: Arc::downgrade(&self.registry),
            events: self.registry.events().clone(),
            error_sink: Arc::clone(&self.error_sink),
            runtime,
            min_period: self.config.min_period,
        });
        self.lock_windows().push(Arc::clone(&window));
        tracing::debug!(window = %name, id = %window_id, "window opened");
        Ok(window)
    }

    /// Navigate: open `name` and close `current`. Jobs already running in
    /// `current` finish and stay counted until done.
    pub fn replace_window(&self, current: &Window, name: &str) -> Result<Arc<Window>> {
        let replacement = self.open_window(name)?;
        self.close_window(current);
        Ok(replacement)
    }

    /// Close a window and prune drained managers. Returns how many jobs were cancelled.
    pub fn close_window(&self, window: &Window) -> usize {
        let cancelled = window.close();
        self.lock_windows().retain(|open| open.id() != window.id());
        self.registry.prune();
        cancelled
    }

    /// Windows that are still open.
    #[must_use]
    pub fn windows(&self) -> Vec<Arc<Window>> {
        let mut windows = self.lock_windows();
        windows.retain(|window| !window.is_closed());
        windows.clone()
    }

    /// Open window by id.
    #[must_use]
    pub fn window(&self, id: WindowId) -> Option<Arc<Window>> {
        self.windows().into_iter().find(|window| window.id() == id)
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Registry of every manager with (possibly) outstanding work.
    #[must_use]
    pub fn registry(&self) -> &Arc<ManagerRegistry> {
        &self.registry
    }

    /// Waiter over this client's registry.
    #[must_use]
    pub fn waiter(&self) -> QuiescenceWaiter {
        QuiescenceWaiter::new(Arc::clone(&self.registry), self.config.poll_interval)
    }

    /// See [`QuiescenceWaiter::wait_until_no_job_starts_within`].
    pub async fn wait_until_no_job_starts_within(
        &self,
        horizon: Duration,
        timeout: Option<Duration>,
    ) -> usize {
        self.waiter()
            .wait_until_no_job_starts_within(horizon, timeout)
            .await
    }

    /// See [`QuiescenceWaiter::wait_until_idle`].
    pub async fn wait_until_idle(&self, timeout: Duration) -> usize {
        self.waiter().wait_until_idle(timeout).await
    }

    /// See [`QuiescenceWaiter::settle_within`].
    pub async fn settle_within(&self, horizon: Duration, timeout: Option<Duration>) -> WaitOutcome {
        self.waiter().settle_within(horizon, timeout).await
    }

    /// See [`QuiescenceWaiter::settle_idle`].
    pub async fn settle_idle(&self, timeout: Duration) -> WaitOutcome {
        self.waiter().settle_idle(timeout).await
    }

    /// Jobs outstanding across every registered manager.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.registry.total_count()
    }

    /// Per-manager metrics.
    #[must_use]
    pub fn metrics(&self) -> Vec<JobMetricsSnapshot> {
        self.registry.metrics()
    }

    /// Receive every job state change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.registry.subscribe()
    }

    /// Close every window and shut every manager down. Later `open_window`
    /// calls fail with [`TimerError::ClientShutdown`].
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let windows = std::mem::take(&mut *self.lock_windows());
        for window in &windows {
            window.close();
            window.job_manager().shutdown();
        }
        let managers = self.registry.clear();
        for manager in &managers {
            manager.shutdown();
        }
        tracing::info!(
            windows = windows.len(),
            managers = managers.len(),
            "timer client shut down"
        );
    }

    fn lock_windows(&self) -> MutexGuard<'_, Vec<Arc<Window>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TimerClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TimerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerClient")
            .field("config", &self.config)
            .field("windows", &self.lock_windows().len())
            .field("managers", &self.registry.len())
            .finish()
    }
}
