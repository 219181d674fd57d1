//! Error types for timer scheduling.

use thiserror::Error;

/// Scheduler errors.
///
/// Callback failures are not errors of this kind: they are reported to the
/// client's [`ErrorSink`](crate::ErrorSink) and never surface to the caller that
/// scheduled the job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A job was scheduled on a manager after `shutdown()`.
    #[error("job manager for window '{window}' has been shut down")]
    ManagerShutdown {
        /// Name of the window that owned the manager.
        window: String,
    },

    /// A window was opened on a client after `shutdown()`.
    #[error("timer client has been shut down")]
    ClientShutdown,

    /// A window was opened outside a tokio runtime.
    #[error("no tokio runtime available to run window jobs")]
    NoRuntime,
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, TimerError>;
