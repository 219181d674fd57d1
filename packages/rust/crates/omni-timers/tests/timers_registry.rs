#![allow(missing_docs)]

mod support;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use omni_timers::{JobEventKind, JobSpec, TimerError};

use support::{client, counting, ms};

#[tokio::test(start_paused = true)]
async fn managers_register_on_first_schedule_only_once() {
    let client = client();
    let window = client.open_window("main").expect("open window");
    let ran = Arc::new(AtomicUsize::new(0));
    assert!(client.registry().is_empty());

    window
        .job_manager()
        .schedule(JobSpec::once(ms(10)), counting(&ran))
        .expect("schedule first");
    window
        .job_manager()
        .schedule(JobSpec::once(ms(20)), counting(&ran))
        .expect("schedule second");

    assert_eq!(client.registry().len(), 1);
    assert!(!client.registry().register(window.job_manager()));
    assert_eq!(client.job_count(), 2);
    assert_eq!(client.registry().total_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn prune_drops_only_closed_and_drained_managers() {
    let client = client();
    let open = client.open_window("open").expect("open window");
    let closed = client.open_window("closed").expect("open window");
    let ran = Arc::new(AtomicUsize::new(0));

    open.job_manager()
        .schedule(JobSpec::once(ms(10)), counting(&ran))
        .expect("schedule open");
    closed
        .job_manager()
        .schedule(JobSpec::once(Duration::from_secs(60)), counting(&ran))
        .expect("schedule closed");
    assert_eq!(client.registry().len(), 2);

    assert_eq!(client.close_window(&closed), 1);
    assert_eq!(client.wait_until_idle(Duration::from_secs(5)).await, 0);
    assert_eq!(client.registry().prune(), 0);

    let remaining = client.registry().all();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].window_id(), open.id());
    assert_eq!(client.windows().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pruned_manager_registers_again_when_it_gets_work() {
    let client = client();
    let window = client.open_window("main").expect("open window");
    let ran = Arc::new(AtomicUsize::new(0));
    let manager = Arc::clone(window.job_manager());

    manager
        .schedule(JobSpec::once(ms(10)), counting(&ran))
        .expect("schedule");
    client.close_window(&window);
    assert!(client.registry().is_empty());

    manager
        .schedule(JobSpec::once(ms(10)), counting(&ran))
        .expect("schedule after close");
    assert_eq!(client.registry().len(), 1);
    assert!(client.registry().earliest_due_at().is_some());
    assert_eq!(client.wait_until_idle(Duration::from_secs(5)).await, 0);
    assert!(client.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn events_follow_a_job_through_its_lifecycle() {
    let client = client();
    let mut events = client.subscribe();
    let window = client.open_window("main").expect("open window");
    let ran = Arc::new(AtomicUsize::new(0));

    let job_id = window
        .job_manager()
        .schedule(JobSpec::once(ms(10)), counting(&ran))
        .expect("schedule");
    assert_eq!(client.wait_until_idle(Duration::from_secs(5)).await, 0);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.window, window.id());
        assert_eq!(event.job_id, Some(job_id));
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![
            JobEventKind::Scheduled,
            JobEventKind::Started,
            JobEventKind::Completed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn client_shutdown_stops_everything() {
    let client = client();
    let window = client.open_window("main").expect("open window");
    let ran = Arc::new(AtomicUsize::new(0));
    window
        .job_manager()
        .schedule(JobSpec::interval(ms(10)), counting(&ran))
        .expect("schedule");

    client.shutdown();
    assert!(window.is_closed());
    assert!(window.job_manager().is_shut_down());
    assert!(client.registry().is_empty());
    assert_eq!(client.job_count(), 0);
    assert_eq!(
        client.open_window("late").expect_err("client is shut down"),
        TimerError::ClientShutdown
    );
}

#[test]
fn opening_a_window_requires_a_runtime() {
    let client = client();
    assert_eq!(
        client.open_window("main").expect_err("no runtime"),
        TimerError::NoRuntime
    );
}
