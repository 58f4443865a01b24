//! Pomodoro timer applet for desktop panels.
//!
//! The [`pomodoro::Engine`] is a tick-driven state machine, persisted settings
//! live in a [`config::ConfigStore`], and [`applet::Applet`] pairs the two
//! behind the [`pomodoro::EngineEvents`] interface that every front end drives.

pub mod applet;
pub mod config;
pub mod hypr;
pub mod notify;
pub mod pomodoro;
pub mod scheduler;
pub mod ws;
