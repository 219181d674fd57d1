//! Resolved runtime configuration for a timer client.

use std::time::Duration;

use crate::config::TimerSettings;

/// Default upper bound between waiter re-checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Default smallest interval period.
pub const DEFAULT_MIN_PERIOD: Duration = Duration::from_millis(1);
/// Default per-receiver event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Settings with defaults applied and values clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Upper bound between waiter re-checks when no event arrives.
    pub poll_interval: Duration,
    /// Interval periods below this are raised to it.
    pub min_period: Duration,
    /// Per-receiver broadcast buffer of the event bus.
    pub event_capacity: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_period: DEFAULT_MIN_PERIOD,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl TimerConfig {
    /// Resolve raw settings. Zero values are raised to 1.
    #[must_use]
    pub fn from_settings(settings: &TimerSettings) -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: settings
                .waiter
                .poll_interval_ms
                .map_or(defaults.poll_interval, |ms| Duration::from_millis(ms.max(1))),
            min_period: settings
                .manager
                .min_period_ms
                .map_or(defaults.min_period, |ms| Duration::from_millis(ms.max(1))),
            event_capacity: settings
                .events
                .capacity
                .map_or(defaults.event_capacity, |capacity| capacity.max(1)),
        }
    }

    /// Override the poll interval (clamped to at least 1 ms).
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }
}
