//! Settings loader for omni-timers.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/timers.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/timers.yaml`
//!
//! Merge precedence is user over system.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/timers.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/timers.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Raw settings as read from YAML; every field optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TimerSettings {
    /// Quiescence waiter settings.
    #[serde(default)]
    pub waiter: WaiterSettings,
    /// Job manager settings.
    #[serde(default)]
    pub manager: ManagerSettings,
    /// Event bus settings.
    #[serde(default)]
    pub events: EventSettings,
}

/// `waiter:` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct WaiterSettings {
    /// Upper bound between re-checks when no event arrives.
    pub poll_interval_ms: Option<u64>,
}

/// `manager:` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Smallest accepted interval period.
    pub min_period_ms: Option<u64>,
}

/// `events:` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EventSettings {
    /// Per-receiver broadcast buffer.
    pub capacity: Option<usize>,
}

impl TimerSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            waiter: self.waiter.merge(overlay.waiter),
            manager: self.manager.merge(overlay.manager),
            events: self.events.merge(overlay.events),
        }
    }
}

impl WaiterSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            poll_interval_ms: overlay.poll_interval_ms.or(self.poll_interval_ms),
        }
    }
}

impl ManagerSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            min_period_ms: overlay.min_period_ms.or(self.min_period_ms),
        }
    }
}

impl EventSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            capacity: overlay.capacity.or(self.capacity),
        }
    }
}

/// Load merged settings (user overrides system).
pub fn load_timer_settings() -> TimerSettings {
    let (system_path, user_path) = timer_settings_paths();
    load_timer_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn timer_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_timer_settings_from_paths(system: &Path, user: &Path) -> TimerSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> TimerSettings {
    if !path.exists() {
        return TimerSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read timer settings file; ignoring"
            );
            return TimerSettings::default();
        }
    };
    if raw.trim().is_empty() {
        return TimerSettings::default();
    }
    match serde_yaml::from_str::<TimerSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse timer settings yaml; ignoring file"
            );
            TimerSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }

    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_wins_field_by_field() {
        let system = TimerSettings {
            waiter: WaiterSettings {
                poll_interval_ms: Some(100),
            },
            manager: ManagerSettings {
                min_period_ms: Some(4),
            },
            events: EventSettings::default(),
        };
        let user = TimerSettings {
            waiter: WaiterSettings {
                poll_interval_ms: Some(20),
            },
            ..TimerSettings::default()
        };
        let merged = system.merge(user);
        assert_eq!(merged.waiter.poll_interval_ms, Some(20));
        assert_eq!(merged.manager.min_period_ms, Some(4));
        assert_eq!(merged.events.capacity, None);
    }

    #[test]
    fn test_absolutize_keeps_absolute_paths() {
        let root = Path::new("/srv/project");
        assert_eq!(
            absolutize(root, PathBuf::from("/etc/omni")),
            PathBuf::from("/etc/omni")
        );
        assert_eq!(
            absolutize(root, PathBuf::from(".config")),
            PathBuf::from("/srv/project/.config")
        );
    }
}
