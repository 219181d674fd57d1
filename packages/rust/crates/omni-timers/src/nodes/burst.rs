use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use omni_timers::{CollectingErrorSink, JobSpec, TimerClient, TimerConfig};

use super::WorkloadReport;

const UNLOAD_DELAY: Duration = Duration::from_millis(20);

pub(crate) struct BurstWorkload {
    pub(crate) windows: u64,
    pub(crate) jobs: u64,
    pub(crate) max_delay_ms: u64,
    pub(crate) timeout_ms: u64,
}

/// Spread `jobs` timers over each window. The last timer of every window but
/// the first closes its window and leaves one unload job behind on the closed
/// window's manager, which the idle wait still has to drain.
pub(crate) async fn run_burst_mode(
    config: TimerConfig,
    workload: BurstWorkload,
) -> anyhow::Result<WorkloadReport> {
    let sink = Arc::new(CollectingErrorSink::new());
    let client = TimerClient::with_error_sink(config, sink.clone());
    let runs = Arc::new(AtomicU64::new(0));
    let jobs = workload.jobs.max(1);
    let started = Instant::now();

    for index in 0..workload.windows.max(1) {
        let window = client.open_window(&format!("burst-{index}"))?;
        let closes_itself = index > 0;
        for job in 0..jobs {
            let delay = spread_delay(workload.max_delay_ms, job, jobs);
            let last = job + 1 == jobs;
            let runs = Arc::clone(&runs);
            window.set_timeout(delay, move |ctx| {
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::Relaxed);
                    if last
                        && closes_itself
                        && let Some(window) = ctx.window()
                    {
                        window.close();
                        let runs = Arc::clone(&runs);
                        ctx.job_manager().schedule_fn(
                            JobSpec::once(UNLOAD_DELAY).with_label("unload"),
                            move |_ctx| {
                                let runs = Arc::clone(&runs);
                                async move {
                                    runs.fetch_add(1, Ordering::Relaxed);
                                    anyhow::Ok(())
                                }
                            },
                        )?;
                    }
                    anyhow::Ok(())
                }
            })?;
        }
    }
    tracing::info!(
        windows = workload.windows.max(1),
        jobs_per_window = jobs,
        outstanding = client.job_count(),
        "burst scheduled"
    );

    let outcome = client
        .settle_idle(Duration::from_millis(workload.timeout_ms))
        .await;
    let elapsed = started.elapsed();

    Ok(WorkloadReport::collect(
        "burst",
        &client,
        &sink,
        outcome,
        runs.load(Ordering::Relaxed),
        elapsed,
    ))
}

/// Delay of job `index` out of `count`, spread evenly over `0..max_delay_ms`.
fn spread_delay(max_delay_ms: u64, index: u64, count: u64) -> Duration {
    let millis = u128::from(max_delay_ms) * u128::from(index) / u128::from(count.max(1));
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_delay_is_even() {
        assert_eq!(spread_delay(500, 0, 10), Duration::ZERO);
        assert_eq!(spread_delay(500, 5, 10), Duration::from_millis(250));
        assert_eq!(spread_delay(500, 9, 10), Duration::from_millis(450));
    }

    #[test]
    fn test_spread_delay_handles_huge_inputs() {
        assert_eq!(
            spread_delay(u64::MAX, u64::MAX - 1, u64::MAX),
            Duration::from_millis(u64::MAX - 1)
        );
        assert_eq!(spread_delay(u64::MAX, 3, 0), Duration::from_millis(u64::MAX));
    }
}
