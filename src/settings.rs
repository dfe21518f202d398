use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;
const DEFAULT_NOTIFY_BEFORE_MINUTES: i64 = 10;
const DEFAULT_UNDO_LIMIT: usize = 100;

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(err) => write!(f, "io error: {err}"),
            SettingsError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(value: std::io::Error) -> Self {
        SettingsError::Io(value)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(value: serde_json::Error) -> Self {
        SettingsError::Json(value)
    }
}

// One week.
pub const MAX_NOTIFY_BEFORE_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_notify_before_minutes")]
    pub notify_before_minutes: i64,
    // `null` keeps every deletion undoable.
    #[serde(default = "default_undo_limit")]
    pub undo_limit: Option<usize>,
    // Rotated log files go here; stderr when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            notify_before_minutes: default_notify_before_minutes(),
            undo_limit: default_undo_limit(),
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn notify_before(&self) -> chrono::Duration {
        if self.notify_before_minutes > MAX_NOTIFY_BEFORE_MINUTES {
            log::warn!(
                "notify_before_minutes={} too large; using {MAX_NOTIFY_BEFORE_MINUTES}",
                self.notify_before_minutes
            );
        }
        let minutes = self.notify_before_minutes.clamp(0, MAX_NOTIFY_BEFORE_MINUTES);
        chrono::Duration::minutes(minutes)
    }

    // A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("settings file missing path={}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }
}

fn default_tick_interval_secs() -> u64 {
    DEFAULT_TICK_INTERVAL_SECS
}

fn default_notify_before_minutes() -> i64 {
    DEFAULT_NOTIFY_BEFORE_MINUTES
}

fn default_undo_limit() -> Option<usize> {
    Some(DEFAULT_UNDO_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn settings_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.tick_interval_secs, 60);
        assert_eq!(settings.notify_before_minutes, 10);
        assert_eq!(settings.undo_limit, Some(100));
        assert!(settings.log_dir.is_none());
        assert_eq!(settings.tick_interval(), Duration::from_secs(60));
        assert_eq!(settings.notify_before(), chrono::Duration::minutes(10));
    }

    #[test]
    fn settings_serde_applies_defaults_for_missing_fields() {
        let json = r#"{ "notify_before_minutes": 5, "undo_limit": null }"#;
        let settings: Settings = serde_json::from_str(json).expect("settings should deserialize");
        assert_eq!(settings.notify_before_minutes, 5);
        assert_eq!(settings.undo_limit, None);
        assert_eq!(settings.tick_interval_secs, 60);
        assert!(settings.log_dir.is_none());
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let settings = Settings {
            tick_interval_secs: 0,
            notify_before_minutes: -3,
            ..Settings::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
        assert_eq!(settings.notify_before(), chrono::Duration::zero());

        let week = chrono::Duration::minutes(MAX_NOTIFY_BEFORE_MINUTES);
        for minutes in [i64::MAX, 1_000_000_000_000, MAX_NOTIFY_BEFORE_MINUTES + 1] {
            let settings = Settings {
                notify_before_minutes: minutes,
                ..Settings::default()
            };
            assert_eq!(settings.notify_before(), week);
        }
        let settings = Settings {
            notify_before_minutes: i64::MIN,
            ..Settings::default()
        };
        assert_eq!(settings.notify_before(), chrono::Duration::zero());
    }

    #[test]
    fn load_reads_file_and_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(Settings::load(&missing).unwrap(), Settings::default());

        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "tick_interval_secs": 5, "log_dir": "/tmp/tt" }"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.tick_interval_secs, 5);
        assert_eq!(settings.log_dir, Some(PathBuf::from("/tmp/tt")));
    }

    #[test]
    fn load_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
        assert!(err.to_string().starts_with("json error:"));
    }
}
