use std::time::Duration;

use serde::Serialize;

use omni_timers::{CollectingErrorSink, JobMetricsSnapshot, TimerClient, WaitOutcome};

/// JSON printed to stdout after a workload settles (or times out).
#[derive(Debug, Serialize)]
pub(crate) struct WorkloadReport {
    pub(crate) workload: &'static str,
    pub(crate) remaining: usize,
    pub(crate) timed_out: bool,
    pub(crate) passes: u64,
    pub(crate) runs: u64,
    pub(crate) failures: Vec<String>,
    pub(crate) elapsed_ms: u64,
    pub(crate) managers: Vec<JobMetricsSnapshot>,
}

impl WorkloadReport {
    pub(crate) fn collect(
        workload: &'static str,
        client: &TimerClient,
        sink: &CollectingErrorSink,
        outcome: WaitOutcome,
        runs: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            workload,
            remaining: outcome.remaining,
            timed_out: outcome.timed_out,
            passes: outcome.passes,
            runs,
            failures: sink
                .failures()
                .iter()
                .map(ToString::to_string)
                .collect(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            managers: client.metrics(),
        }
    }
}
