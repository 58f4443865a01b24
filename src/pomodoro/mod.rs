pub mod display;
#[allow(clippy::module_inception)]
pub mod pomodoro;

pub use display::{Clock, duration_label, panel_label, session_glyphs};
pub use pomodoro::{
    Engine, EngineEvents, NOT_STARTED, SessionState, Snapshot, TICK_INTERVAL, TimerState,
    duration_from_fraction,
};
