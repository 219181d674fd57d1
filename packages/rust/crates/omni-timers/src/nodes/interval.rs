use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use omni_timers::{CollectingErrorSink, TimerClient, TimerConfig};

use super::WorkloadReport;

pub(crate) struct IntervalWorkload {
    pub(crate) period_ms: u64,
    pub(crate) ticks: u64,
    pub(crate) timeout_ms: u64,
}

pub(crate) async fn run_interval_mode(
    config: TimerConfig,
    workload: IntervalWorkload,
) -> anyhow::Result<WorkloadReport> {
    let sink = Arc::new(CollectingErrorSink::new());
    let client = TimerClient::with_error_sink(config, sink.clone());
    let window = client.open_window("interval")?;
    let runs = Arc::new(AtomicU64::new(0));
    let target = workload.ticks.max(1);
    let started = Instant::now();

    let counter = Arc::clone(&runs);
    let job_id = window.set_interval(Duration::from_millis(workload.period_ms), move |ctx| {
        let counter = Arc::clone(&counter);
        async move {
            let tick = counter.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(job_id = %ctx.job_id(), tick, "interval tick");
            if tick >= target {
                ctx.cancel_self();
            }
            anyhow::Ok(())
        }
    })?;
    tracing::info!(%job_id, period_ms = workload.period_ms, ticks = target, "interval scheduled");

    let outcome = client
        .settle_idle(Duration::from_millis(workload.timeout_ms))
        .await;
    let elapsed = started.elapsed();

    Ok(WorkloadReport::collect(
        "interval",
        &client,
        &sink,
        outcome,
        runs.load(Ordering::Relaxed),
        elapsed,
    ))
}
