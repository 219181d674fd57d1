//! Error sink for callback failures.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::job::JobId;
use crate::window::WindowId;

/// How a callback failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Callback returned `Err`.
    Error(String),
    /// Callback panicked.
    Panic(String),
}

/// One failed callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Window whose worker ran the callback.
    pub window: WindowId,
    /// Window name at creation.
    pub window_name: String,
    /// Failed job.
    pub job_id: JobId,
    /// Job label, if any.
    pub label: Option<String>,
    /// Error or panic message.
    pub kind: FailureKind,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label.as_deref().unwrap_or("-");
        match &self.kind {
            FailureKind::Error(message) => write!(
                f,
                "{} ({}) {} [{label}] failed: {message}",
                self.window_name, self.window, self.job_id
            ),
            FailureKind::Panic(message) => write!(
                f,
                "{} ({}) {} [{label}] panicked: {message}",
                self.window_name, self.window, self.job_id
            ),
        }
    }
}

/// Receives callback failures. Must not block.
pub trait ErrorSink: Send + Sync {
    /// Report one failure.
    fn report(&self, failure: &JobFailure);
}

/// Logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, failure: &JobFailure) {
        tracing::error!(
            window = %failure.window_name,
            job_id = %failure.job_id,
            label = failure.label.as_deref().unwrap_or("-"),
            "{failure}"
        );
    }
}

/// Keeps every failure in memory (and logs it).
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    failures: Mutex<Vec<JobFailure>>,
}

impl CollectingErrorSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures reported so far, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<JobFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of failures reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// No failures reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, failure: &JobFailure) {
        TracingErrorSink.report(failure);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_failures() {
        let sink = CollectingErrorSink::new();
        assert!(sink.is_empty());
        sink.report(&JobFailure {
            window: WindowId::new(1),
            window_name: "main".to_string(),
            job_id: JobId::new(4),
            label: None,
            kind: FailureKind::Panic("boom".to_string()),
        });
        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.failures()[0].to_string(),
            "main (window-1) job-4 [-] panicked: boom"
        );
    }
}
