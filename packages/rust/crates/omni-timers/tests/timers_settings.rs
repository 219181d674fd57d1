#![allow(missing_docs)]

use std::time::Duration;

use omni_timers::{DEFAULT_MIN_PERIOD, TimerConfig, load_timer_settings_from_paths};

#[test]
fn user_settings_override_system_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let system = temp.path().join("system.yaml");
    let user = temp.path().join("user.yaml");
    std::fs::write(
        &system,
        "waiter:\n  poll_interval_ms: 20\nevents:\n  capacity: 64\n",
    )
    .expect("write system settings");
    std::fs::write(&user, "waiter:\n  poll_interval_ms: 5\n").expect("write user settings");

    let settings = load_timer_settings_from_paths(&system, &user);
    assert_eq!(settings.waiter.poll_interval_ms, Some(5));
    assert_eq!(settings.events.capacity, Some(64));
    assert_eq!(settings.manager.min_period_ms, None);

    let config = TimerConfig::from_settings(&settings);
    assert_eq!(config.poll_interval, Duration::from_millis(5));
    assert_eq!(config.min_period, DEFAULT_MIN_PERIOD);
    assert_eq!(config.event_capacity, 64);
}

#[test]
fn invalid_or_missing_files_fall_back() {
    let temp = tempfile::tempdir().expect("tempdir");
    let system = temp.path().join("system.yaml");
    let user = temp.path().join("user.yaml");
    std::fs::write(&system, "manager:\n  min_period_ms: 4\n").expect("write system settings");
    std::fs::write(&user, "waiter: [not, a, map\n").expect("write user settings");

    let settings = load_timer_settings_from_paths(&system, &user);
    assert_eq!(settings.manager.min_period_ms, Some(4));
    assert_eq!(settings.waiter.poll_interval_ms, None);

    let missing = temp.path().join("missing.yaml");
    let empty = temp.path().join("empty.yaml");
    std::fs::write(&empty, "   \n").expect("write empty settings");
    assert_eq!(
        TimerConfig::from_settings(&load_timer_settings_from_paths(&missing, &empty)),
        TimerConfig::default()
    );
}
