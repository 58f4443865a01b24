use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

pub const DEFAULT_POMODORO_DURATION: u32 = 1500; // 25 minutes
pub const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "pomodoro-applet";

const TIMER_GROUP: &str = "timer";
const OPTIONS_GROUP: &str = "options";
const DURATION_KEY: &str = "pomodoro_duration";
const COUNTDOWN_KEY: &str = "is_countdown";
const MESSAGES_KEY: &str = "show_messages";

/// User-facing options that survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Length of one pomodoro in seconds, always a whole number of minutes
    pub pomodoro_duration: u32,
    /// Show remaining time instead of elapsed time
    pub show_countdown: bool,
    /// Emit a desktop notification when a pomodoro finishes
    pub show_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro_duration: DEFAULT_POMODORO_DURATION,
            show_countdown: true,
            show_notifications: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

// On-disk shape. Field order is the group/key order in the written file.
#[derive(Debug, Serialize)]
struct Document {
    timer: TimerGroup,
    options: OptionsGroup,
}

#[derive(Debug, Serialize)]
struct TimerGroup {
    pomodoro_duration: u32,
}

#[derive(Debug, Serialize)]
struct OptionsGroup {
    is_countdown: bool,
    show_messages: bool,
}

impl From<&Settings> for Document {
    fn from(settings: &Settings) -> Self {
        Self {
            timer: TimerGroup {
                pomodoro_duration: settings.pomodoro_duration,
            },
            options: OptionsGroup {
                is_countdown: settings.show_countdown,
                show_messages: settings.show_notifications,
            },
        }
    }
}

/// Round a duration up to the next whole minute.
///
/// Returns `None` for zero or for values that no longer fit in `u32` once rounded.
pub fn normalize_duration(seconds: u64) -> Option<u32> {
    if seconds == 0 {
        return None;
    }
    u32::try_from(seconds.div_ceil(60) * 60).ok()
}

/// Reads and writes [`Settings`] as a grouped JSON document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/pomodoro-applet/config.json`, e.g. `~/.config/pomodoro-applet/config.json` on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, never failing.
    ///
    /// A missing file yields the defaults. An unreadable or unparseable file is
    /// logged and yields the defaults. Otherwise every entry is recovered on its
    /// own, so one bad value does not discard the others.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                error!("Error reading config file, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    /// Like [`ConfigStore::load`] but reports read and parse failures.
    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        if !self.path.exists() {
            debug!("No config file at {:?}, using defaults", self.path);
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let document: Value =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;

        Ok(settings_from_document(&document))
    }

    /// Write settings, replacing the file in one rename.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(&Document::from(settings))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, data).map_err(|source| ConfigError::Write {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!("Saved config to {:?}", self.path);
        Ok(())
    }
}

/// Non-negative integer, also when written as a float with no fraction (`1800.0`).
fn whole_seconds(value: &Value) -> Option<u64> {
    if let Some(seconds) = value.as_u64() {
        return Some(seconds);
    }
    let seconds = value.as_f64()?;
    let whole = seconds.is_finite() && seconds.fract() == 0.0;
    if whole && seconds > 0.0 && seconds <= u64::MAX as f64 {
        Some(seconds as u64)
    } else {
        None
    }
}

/// Like [`normalize_duration`] but always yields a usable duration:
/// zero becomes one minute, overlong values the longest whole-minute duration.
pub fn clamp_duration(seconds: u32) -> u32 {
    match normalize_duration(u64::from(seconds)) {
        Some(duration) => duration,
        None if seconds == 0 => 60,
        None => u32::MAX / 60 * 60,
    }
}

fn entry<'a>(document: &'a Value, group: &str, key: &str) -> Option<&'a Value> {
    document.get(group)?.get(key)
}

fn settings_from_document(document: &Value) -> Settings {
    let defaults = Settings::default();

    if !document.is_object() {
        warn!("Config document is not an object, using defaults");
        return defaults;
    }

    let pomodoro_duration = match entry(document, TIMER_GROUP, DURATION_KEY) {
        None => defaults.pomodoro_duration,
        Some(value) => match whole_seconds(value).and_then(normalize_duration) {
            Some(duration) => duration,
            None => {
                warn!(
                    "Invalid {}.{} value {}, using default",
                    TIMER_GROUP, DURATION_KEY, value
                );
                defaults.pomodoro_duration
            }
        },
    };

    Settings {
        pomodoro_duration,
        show_countdown: bool_entry(document, COUNTDOWN_KEY, defaults.show_countdown),
        show_notifications: bool_entry(document, MESSAGES_KEY, defaults.show_notifications),
    }
}

fn bool_entry(document: &Value, key: &str, default: bool) -> bool {
    match entry(document, OPTIONS_GROUP, key) {
        None => default,
        Some(value) => value.as_bool().unwrap_or_else(|| {
            warn!(
                "Invalid {}.{} value {}, using default",
                OPTIONS_GROUP, key, value
            );
            default
        }),
    }
}
