pub mod store;

pub use store::{
    CONFIG_FILE_NAME, ConfigError, ConfigStore, DEFAULT_POMODORO_DURATION, Settings,
    clamp_duration, normalize_duration,
};
