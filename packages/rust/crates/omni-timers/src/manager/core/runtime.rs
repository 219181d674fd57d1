use std::sync::Arc;

use tokio::time::Instant;

use crate::callback::JobContext;
use crate::events::JobEventKind;
use crate::job::{JobId, RunOutcome};
use crate::manager::types::{millis_between, panic_message};
use crate::sink::{FailureKind, JobFailure};

use super::JobManager;

impl JobManager {
    pub(super) fn spawn_worker_loop(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        self.runtime.spawn(async move {
            tracing::debug!(window = %manager.window_name, "job worker started");
            manager.worker_loop().await;
            tracing::debug!(window = %manager.window_name, "job worker stopped");
        });
    }

    async fn worker_loop(self: &Arc<Self>) {
        loop {
            let next = {
                let mut table = self.lock_table();
                if table.shut_down {
                    return;
                }
                let next = table.next_pending();
                // A closed window's worker retires once drained; the next
                // schedule() on this manager starts a fresh one.
                if next.is_none() && table.running.is_none() && self.is_window_closed() {
                    table.worker_active = false;
                    return;
                }
                next
            };

            match next {
                None => self.wakeup.notified().await,
                Some((due_at, _)) if due_at > Instant::now() => {
                    tokio::select! {
                        () = tokio::time::sleep_until(due_at) => {}
                        () = self.wakeup.notified() => {}
                    }
                }
                Some((due_at, job_id)) => {
                    self.execute(job_id, Some(due_at)).await;
                }
            }
        }
    }

    /// Run one job now, outside the worker's own schedule.
    ///
    /// Returns `false` if the job was cancelled, already removed, or the
    /// manager is shut down. Waits for an in-flight callback of this manager
    /// to finish first, so it must not be called from one of its callbacks.
    pub async fn run_one(self: &Arc<Self>, job_id: JobId) -> bool {
        let ran = self.execute(job_id, None).await;
        if ran {
            self.wakeup.notify_one();
        }
        ran
    }

    async fn execute(self: &Arc<Self>, job_id: JobId, expected_due: Option<Instant>) -> bool {
        let _gate = self.exec_gate.lock().await;
        let Some(claim) = self.lock_table().claim(job_id, expected_due) else {
            return false;
        };

        let started_at = Instant::now();
        tracing::trace!(
            window = %self.window_name,
            %job_id,
            lateness_ms = millis_between(claim.due_at, started_at),
            "running job"
        );
        self.publish(Some(job_id), JobEventKind::Started);

        let ctx = JobContext::new(job_id, Arc::clone(self));
        let callback = claim.callback;
        let result = self.runtime.spawn(async move { callback.run(ctx).await }).await;
        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(FailureKind::Error(format!("{error:#}"))),
            Err(join_error) if join_error.is_panic() => {
                Some(FailureKind::Panic(panic_message(&*join_error.into_panic())))
            }
            Err(join_error) => Some(FailureKind::Error(join_error.to_string())),
        };
        if let Some(kind) = failure {
            self.error_sink.report(&JobFailure {
                window: self.window_id,
                window_name: self.window_name.clone(),
                job_id,
                label: claim.label,
                kind,
            });
            self.publish(Some(job_id), JobEventKind::Failed);
        }

        let finished_at = Instant::now();
        let outcome = self.lock_table().finish(job_id, finished_at);
        tracing::trace!(
            window = %self.window_name,
            %job_id,
            elapsed_ms = millis_between(started_at, finished_at),
            ?outcome,
            "job finished"
        );
        match outcome {
            Some(RunOutcome::Rescheduled(_)) => {
                self.publish(Some(job_id), JobEventKind::Rescheduled);
            }
            Some(RunOutcome::Removed) | None => {
                self.publish(Some(job_id), JobEventKind::Completed);
            }
        }
        true
    }
}
