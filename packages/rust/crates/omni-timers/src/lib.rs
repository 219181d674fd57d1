//! omni-timers: browser-style timer queues with cross-window quiescence waiting.
//!
//! Each [`Window`] owns a [`JobManager`] that runs one-shot and interval jobs
//! serially, in due order, on its own tokio task. Every manager that has
//! scheduled work is tracked by the client's [`ManagerRegistry`], including
//! managers of windows that were closed while a callback was still running.
//! A [`QuiescenceWaiter`] lets a test driver block until nothing is due within
//! a horizon, or until no job is left at all.
//!
//! ```text
//! Window.set_timeout() → JobManager.schedule() → registry.register()
//!      ↓
//! worker loop: sleep until due → run callback → reschedule / remove → JobEvent
//!      ↓
//! QuiescenceWaiter: snapshot registry → check → wait for JobEvent or poll tick
//! ```
//!
//! Logging: set `RUST_LOG=omni_timers=debug` (or `trace` for per-job churn).

mod callback;
mod client;
mod config;
mod error;
mod events;
mod job;
mod manager;
mod registry;
mod sink;
mod waiter;
mod window;

pub use callback::{JobCallback, JobContext, callback_fn};
pub use client::TimerClient;
pub use config::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_MIN_PERIOD, DEFAULT_POLL_INTERVAL, EventSettings,
    ManagerSettings, TimerConfig, TimerSettings, WaiterSettings, load_timer_settings,
    load_timer_settings_from_paths, set_config_home_override, timer_settings_paths,
};
pub use error::{Result, TimerError};
pub use events::{JobEvent, JobEventBus, JobEventKind};
pub use job::{JobId, JobKind, JobSnapshot, JobSpec};
pub use manager::{JobManager, JobMetricsSnapshot};
pub use registry::ManagerRegistry;
pub use sink::{CollectingErrorSink, ErrorSink, FailureKind, JobFailure, TracingErrorSink};
pub use waiter::{QuiescenceWaiter, WaitOutcome};
pub use window::{Window, WindowId};
