//! Config namespace: YAML settings loading and resolved client config.

mod settings;
mod timer;

pub use settings::{
    EventSettings, ManagerSettings, TimerSettings, WaiterSettings, load_timer_settings,
    load_timer_settings_from_paths, set_config_home_override, timer_settings_paths,
};
pub use timer::{DEFAULT_EVENT_CAPACITY, DEFAULT_MIN_PERIOD, DEFAULT_POLL_INTERVAL, TimerConfig};
