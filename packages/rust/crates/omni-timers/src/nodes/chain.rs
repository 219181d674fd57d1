use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use omni_timers::{CollectingErrorSink, JobManager, JobSpec, TimerClient, TimerConfig};

use super::WorkloadReport;

pub(crate) struct ChainWorkload {
    pub(crate) length: u64,
    pub(crate) delay_ms: u64,
    pub(crate) horizon_ms: u64,
    pub(crate) timeout_ms: u64,
}

pub(crate) async fn run_chain_mode(
    config: TimerConfig,
    workload: ChainWorkload,
) -> anyhow::Result<WorkloadReport> {
    let sink = Arc::new(CollectingErrorSink::new());
    let client = TimerClient::with_error_sink(config, sink.clone());
    let window = client.open_window("chain")?;
    let runs = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    if workload.length > 0 {
        schedule_link(
            window.job_manager(),
            Arc::clone(&runs),
            workload.length,
            Duration::from_millis(workload.delay_ms),
        )?;
    }
    tracing::info!(
        length = workload.length,
        delay_ms = workload.delay_ms,
        horizon_ms = workload.horizon_ms,
        "chain scheduled"
    );

    let outcome = client
        .settle_within(
            Duration::from_millis(workload.horizon_ms),
            Some(Duration::from_millis(workload.timeout_ms)),
        )
        .await;
    let elapsed = started.elapsed();

    Ok(WorkloadReport::collect(
        "chain",
        &client,
        &sink,
        outcome,
        runs.load(Ordering::Relaxed),
        elapsed,
    ))
}

/// Each link schedules the next one from inside its own callback.
fn schedule_link(
    manager: &Arc<JobManager>,
    runs: Arc<AtomicU64>,
    left: u64,
    delay: Duration,
) -> omni_timers::Result<()> {
    let spec = JobSpec::once(delay).with_label(format!("chain-{left}"));
    manager.schedule_fn(spec, move |ctx| {
        let runs = Arc::clone(&runs);
        async move {
            runs.fetch_add(1, Ordering::Relaxed);
            if left > 1 {
                schedule_link(ctx.job_manager(), runs, left - 1, delay)?;
            }
            anyhow::Ok(())
        }
    })?;
    Ok(())
}
