//! State-change events published by job manager workers.
//!
//! ```text
//! JobManager (schedule / cancel / run / shutdown)
//!      ↓
//! JobEventBus.publish() → broadcast::Sender
//!      ↓
//! QuiescenceWaiter wakes up and re-checks the registry
//! ```

use std::fmt;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::job::JobId;
use crate::window::WindowId;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventKind {
    /// Job inserted into a manager.
    Scheduled,
    /// Callback started executing.
    Started,
    /// Run finished and the job was removed.
    Completed,
    /// Run finished and the interval job was re-inserted.
    Rescheduled,
    /// Job cancelled (removed, or flagged if running).
    Cancelled,
    /// Callback returned an error or panicked.
    Failed,
    /// Manager shut down and discarded its jobs.
    ManagerShutdown,
}

impl JobEventKind {
    /// Stable lowercase label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::ManagerShutdown => "manager_shutdown",
        }
    }
}

/// One state-change notification.
#[derive(Debug, Clone)]
pub struct JobEvent {
    /// Window whose manager changed.
    pub window: WindowId,
    /// Affected job; `None` for manager-wide events.
    pub job_id: Option<JobId>,
    /// What changed.
    pub kind: JobEventKind,
    /// When the change was published.
    pub at: Instant,
}

impl JobEvent {
    /// Create an event stamped with the current instant.
    #[must_use]
    pub fn new(window: WindowId, job_id: Option<JobId>, kind: JobEventKind) -> Self {
        Self {
            window,
            job_id,
            kind,
            at: Instant::now(),
        }
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.job_id {
            Some(job_id) => write!(f, "{} {job_id}: {}", self.window, self.kind.as_str()),
            None => write!(f, "{}: {}", self.window, self.kind.as_str()),
        }
    }
}

/// Fan-out channel for [`JobEvent`]s.
///
/// Publishing never blocks; slow receivers see `Lagged` and simply re-check.
#[derive(Clone, Debug)]
pub struct JobEventBus {
    tx: broadcast::Sender<JobEvent>,
    capacity: usize,
}

impl JobEventBus {
    /// Create a bus buffering up to `capacity` events per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Per-receiver buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event. Returns the number of receivers (0 is not an error).
    pub fn publish(&self, event: JobEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Build and publish an event.
    pub fn emit(&self, window: WindowId, job_id: Option<JobId>, kind: JobEventKind) -> usize {
        self.publish(JobEvent::new(window, job_id, kind))
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Current receiver count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = JobEventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let delivered = bus.emit(WindowId::new(3), Some(JobId::new(7)), JobEventKind::Started);
        assert_eq!(delivered, 1);

        let event = rx.recv().await.expect("event should arrive");
        assert_eq!(event.window, WindowId::new(3));
        assert_eq!(event.job_id, Some(JobId::new(7)));
        assert_eq!(event.kind, JobEventKind::Started);
        assert_eq!(event.to_string(), "window-3 job-7: started");
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let bus = JobEventBus::new(0);
        assert_eq!(bus.capacity(), 1);
        assert_eq!(bus.emit(WindowId::new(1), None, JobEventKind::ManagerShutdown), 0);
    }
}
