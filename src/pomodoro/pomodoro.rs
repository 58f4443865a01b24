use super::display::{self, Clock};
use crate::config::{Settings, normalize_duration};
use crate::notify::Notifier;
use crate::scheduler::{Scheduler, TickHandle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const SLIDER_MAX_SECONDS: f64 = 3600.0; // Slider spans 0..1 hour
pub const NOT_STARTED: i64 = -1;

/// Map a slider position (0..1) to a duration, rounded up to a whole minute.
///
/// The result is never shorter than one minute.
pub fn duration_from_fraction(fraction: f64) -> u32 {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let seconds = (fraction * SLIDER_MAX_SECONDS).ceil() as u64;
    normalize_duration(seconds).unwrap_or(60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Stopped,
    Running,
}

/// Ephemeral progress of the current pomodoro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Seconds spent in the current pomodoro, or [`NOT_STARTED`]
    pub elapsed_seconds: i64,
    pub is_running: bool,
    pub completed_sessions: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            elapsed_seconds: NOT_STARTED,
            is_running: false,
            completed_sessions: 0,
        }
    }
}

/// Everything a front end needs to render the applet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: TimerState,
    pub elapsed_seconds: i64,
    pub completed_sessions: u32,
    pub clock: Clock,
    pub label: String,
    pub pomodoro_duration: u32,
    pub duration_label: String,
    pub show_countdown: bool,
    pub show_notifications: bool,
}

/// Typed UI events any front end can drive.
pub trait EngineEvents {
    fn start(&mut self);
    fn stop(&mut self);
    fn toggle(&mut self);
    fn set_duration(&mut self, seconds: u32);
    fn set_show_countdown(&mut self, enabled: bool);
    fn set_show_notifications(&mut self, enabled: bool);
    fn reset_session(&mut self, reset_count: bool);
}

/// Tick-driven pomodoro state machine.
///
/// At most one tick is pending at any time. Stopping, resetting and disposing
/// all cancel it, and [`Engine::on_tick`] ignores any handle other than the
/// pending one.
pub struct Engine<S: Scheduler, N: Notifier> {
    settings: Settings,
    session: SessionState,
    clock: Clock,
    scheduler: S,
    notifier: N,
    pending: Option<TickHandle>,
}

impl<S: Scheduler, N: Notifier> Engine<S, N> {
    pub fn new(settings: Settings, scheduler: S, notifier: N) -> Self {
        Self {
            settings,
            session: SessionState::default(),
            clock: Clock::default(),
            scheduler,
            notifier,
            pending: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn state(&self) -> TimerState {
        if self.session.is_running {
            TimerState::Running
        } else {
            TimerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running
    }

    pub fn has_pending_tick(&self) -> bool {
        self.pending.is_some()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn label(&self) -> String {
        display::panel_label(self.session.completed_sessions, self.clock)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state(),
            elapsed_seconds: self.session.elapsed_seconds,
            completed_sessions: self.session.completed_sessions,
            clock: self.clock,
            label: self.label(),
            pomodoro_duration: self.settings.pomodoro_duration,
            duration_label: display::duration_label(self.settings.pomodoro_duration),
            show_countdown: self.settings.show_countdown,
            show_notifications: self.settings.show_notifications,
        }
    }

    /// Start running. The first tick happens immediately.
    pub fn start(&mut self) {
        if self.session.is_running {
            return;
        }
        debug!("Timer started at elapsed={}", self.session.elapsed_seconds);
        self.session.is_running = true;
        self.tick();
    }

    /// Pause without losing progress.
    pub fn stop(&mut self) {
        if self.session.is_running {
            debug!("Timer stopped at elapsed={}", self.session.elapsed_seconds);
        }
        self.session.is_running = false;
        self.cancel_pending();
    }

    pub fn toggle(&mut self) {
        if self.session.is_running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Advance one second and schedule the next tick while still running.
    pub fn tick(&mut self) {
        self.cancel_pending();
        if !self.session.is_running {
            return;
        }

        self.session.elapsed_seconds += 1;
        self.complete_if_finished();
        self.refresh_clock();

        if self.session.is_running {
            self.pending = Some(self.scheduler.schedule(TICK_INTERVAL));
        }
    }

    /// Scheduler callback. Ticks that are no longer pending are dropped.
    pub fn on_tick(&mut self, handle: TickHandle) {
        if self.pending != Some(handle) {
            debug!("Ignoring stale tick {:?}", handle);
            return;
        }
        self.pending = None;
        self.tick();
    }

    /// Back to the not-started state, optionally forgetting completed sessions.
    pub fn reset(&mut self, reset_session_count: bool) {
        self.cancel_pending();
        self.session.elapsed_seconds = NOT_STARTED;
        self.session.is_running = false;
        self.clock = Clock::default();
        if reset_session_count {
            self.session.completed_sessions = 0;
        }
    }

    /// Use `seconds` exactly as given.
    ///
    /// Callers pass a normalized value (positive, whole minutes); see
    /// [`crate::config::clamp_duration`]. The applet front end always does.
    pub fn set_duration(&mut self, seconds: u32) {
        self.settings.pomodoro_duration = seconds;
        self.reevaluate();
    }

    pub fn set_show_countdown(&mut self, enabled: bool) {
        self.settings.show_countdown = enabled;
        self.reevaluate();
    }

    pub fn set_show_notifications(&mut self, enabled: bool) {
        self.settings.show_notifications = enabled;
        self.reevaluate();
    }

    /// Stop for good: nothing stays scheduled after this.
    pub fn dispose(&mut self) {
        self.session.is_running = false;
        self.cancel_pending();
    }

    fn reevaluate(&mut self) {
        self.complete_if_finished();
        self.refresh_clock();
    }

    fn complete_if_finished(&mut self) {
        let duration = i64::from(self.settings.pomodoro_duration);
        if !self.session.is_running || self.session.elapsed_seconds < duration {
            return;
        }

        self.session.completed_sessions += 1;
        self.reset(false);

        let message = format!("Pomodoro {} finished!", self.session.completed_sessions);
        info!("{}", message);
        if self.settings.show_notifications {
            self.notifier.notify(&message);
        }
    }

    fn refresh_clock(&mut self) {
        if !self.session.is_running {
            return;
        }
        let elapsed = self.session.elapsed_seconds.max(0);
        let shown = if self.settings.show_countdown {
            i64::from(self.settings.pomodoro_duration) - elapsed
        } else {
            elapsed
        };
        self.clock = Clock::from_seconds(shown.max(0) as u64);
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl<S: Scheduler, N: Notifier> EngineEvents for Engine<S, N> {
    fn start(&mut self) {
        Engine::start(self);
    }

    fn stop(&mut self) {
        Engine::stop(self);
    }

    fn toggle(&mut self) {
        Engine::toggle(self);
    }

    fn set_duration(&mut self, seconds: u32) {
        Engine::set_duration(self, seconds);
    }

    fn set_show_countdown(&mut self, enabled: bool) {
        Engine::set_show_countdown(self, enabled);
    }

    fn set_show_notifications(&mut self, enabled: bool) {
        Engine::set_show_notifications(self, enabled);
    }

    fn reset_session(&mut self, reset_count: bool) {
        Engine::reset(self, reset_count);
    }
}

impl<S: Scheduler, N: Notifier> Drop for Engine<S, N> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::scheduler::ManualScheduler;

    type TestEngine = Engine<ManualScheduler, RecordingNotifier>;

    fn engine_with(settings: Settings) -> TestEngine {
        Engine::new(settings, ManualScheduler::new(), RecordingNotifier::new())
    }

    fn engine() -> TestEngine {
        engine_with(Settings::default())
    }

    fn short_engine(duration: u32) -> TestEngine {
        engine_with(Settings {
            pomodoro_duration: duration,
            ..Settings::default()
        })
    }

    /// Let `n` scheduled ticks fire.
    fn advance(engine: &mut TestEngine, n: u32) {
        for _ in 0..n {
            let handle = engine
                .scheduler_mut()
                .fire_next()
                .expect("a tick should be pending");
            engine.on_tick(handle);
        }
    }

    #[test]
    fn test_initial_state() {
        let engine = engine();
        assert_eq!(engine.session(), &SessionState::default());
        assert_eq!(engine.state(), TimerState::Stopped);
        assert_eq!(engine.label(), " 00:00");
        assert!(!engine.has_pending_tick());
    }

    #[test]
    fn test_start_ticks_immediately_and_schedules_next() {
        let mut engine = engine();
        engine.start();

        assert_eq!(engine.session().elapsed_seconds, 0);
        assert!(engine.is_running());
        assert_eq!(engine.clock(), Clock::from_seconds(1500));
        assert_eq!(engine.scheduler().pending(), 1);
        assert_eq!(engine.scheduler().next_delay(), Some(TICK_INTERVAL));
    }

    #[test]
    fn test_start_twice_keeps_single_tick() {
        let mut engine = engine();
        engine.start();
        engine.start();
        assert_eq!(engine.session().elapsed_seconds, 0);
        assert_eq!(engine.scheduler().pending(), 1);
    }

    #[test]
    fn test_countdown_display() {
        let mut engine = short_engine(120);
        engine.start();
        assert_eq!(engine.clock().to_string(), "02:00");

        advance(&mut engine, 119);
        assert_eq!(engine.session().elapsed_seconds, 119);
        assert_eq!(engine.clock(), Clock::from_seconds(1));

        advance(&mut engine, 1);
        assert_eq!(engine.session().completed_sessions, 1);
        assert_eq!(engine.session().elapsed_seconds, NOT_STARTED);
        assert_eq!(engine.clock(), Clock::default());
    }

    #[test]
    fn test_elapsed_display() {
        let mut engine = engine_with(Settings {
            show_countdown: false,
            ..Settings::default()
        });
        engine.start();
        advance(&mut engine, 75);
        assert_eq!(engine.clock().to_string(), "01:15");
    }

    #[test]
    fn test_full_pomodoro_notifies_once() {
        let mut engine = engine();
        engine.start();

        advance(&mut engine, 1499);
        assert!(engine.notifier().messages().is_empty());
        assert_eq!(engine.session().completed_sessions, 0);

        advance(&mut engine, 1);
        assert_eq!(engine.notifier().messages(), ["Pomodoro 1 finished!"]);
        assert_eq!(engine.session().completed_sessions, 1);
        assert_eq!(engine.session().elapsed_seconds, NOT_STARTED);
        assert!(!engine.is_running());
        assert_eq!(engine.scheduler().pending(), 0);
        assert_eq!(engine.label(), "● 00:00");
    }

    #[test]
    fn test_completion_without_notifications() {
        let mut engine = engine_with(Settings {
            pomodoro_duration: 60,
            show_notifications: false,
            ..Settings::default()
        });
        engine.start();
        advance(&mut engine, 60);
        assert_eq!(engine.session().completed_sessions, 1);
        assert!(engine.notifier().messages().is_empty());
    }

    #[test]
    fn test_second_pomodoro_numbering() {
        let mut engine = short_engine(60);
        engine.start();
        advance(&mut engine, 60);
        engine.start();
        advance(&mut engine, 60);
        assert_eq!(
            engine.notifier().messages(),
            ["Pomodoro 1 finished!", "Pomodoro 2 finished!"]
        );
        assert_eq!(engine.label(), "●● 00:00");
    }

    #[test]
    fn test_stop_freezes_then_start_resumes() {
        let mut engine = engine();
        engine.start();
        advance(&mut engine, 10);
        assert_eq!(engine.session().elapsed_seconds, 10);

        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.scheduler().pending(), 0);
        assert_eq!(engine.scheduler().cancelled(), 1);
        engine.tick();
        assert_eq!(engine.session().elapsed_seconds, 10);

        engine.start();
        assert_eq!(engine.session().elapsed_seconds, 11);
        assert_eq!(engine.scheduler().pending(), 1);
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let mut engine = engine();
        engine.start();
        let handle = engine.scheduler_mut().fire_next().unwrap();
        engine.on_tick(handle);
        assert_eq!(engine.session().elapsed_seconds, 1);

        // Same handle delivered again
        engine.on_tick(handle);
        assert_eq!(engine.session().elapsed_seconds, 1);
        assert_eq!(engine.scheduler().pending(), 1);
    }

    #[test]
    fn test_tick_after_stop_with_old_handle() {
        let mut engine = engine();
        engine.start();
        let handle = engine.scheduler_mut().fire_next().unwrap();
        engine.stop();
        engine.on_tick(handle);
        assert_eq!(engine.session().elapsed_seconds, 0);
        assert!(!engine.has_pending_tick());
    }

    #[test]
    fn test_toggle() {
        let mut engine = engine();
        engine.toggle();
        assert!(engine.is_running());
        engine.toggle();
        assert!(!engine.is_running());
        assert_eq!(engine.scheduler().pending(), 0);
    }

    #[test]
    fn test_reset_keeps_or_clears_count() {
        let mut engine = short_engine(60);
        engine.start();
        advance(&mut engine, 60);
        engine.start();
        advance(&mut engine, 5);

        engine.reset(false);
        assert_eq!(engine.session().elapsed_seconds, NOT_STARTED);
        assert!(!engine.is_running());
        assert_eq!(engine.session().completed_sessions, 1);
        assert_eq!(engine.scheduler().pending(), 0);

        engine.reset(true);
        assert_eq!(engine.session().completed_sessions, 0);
        assert_eq!(engine.label(), " 00:00");
    }

    #[test]
    fn test_shrinking_duration_completes_immediately() {
        let mut engine = engine();
        engine.start();
        advance(&mut engine, 120);

        engine.set_duration(60);
        assert_eq!(engine.session().completed_sessions, 1);
        assert_eq!(engine.notifier().messages(), ["Pomodoro 1 finished!"]);
        assert!(!engine.has_pending_tick());
    }

    #[test]
    fn test_shrinking_duration_while_paused_waits_for_resume() {
        let mut engine = engine();
        engine.start();
        advance(&mut engine, 120);
        engine.stop();

        engine.set_duration(60);
        assert_eq!(engine.session().completed_sessions, 0);

        engine.start();
        assert_eq!(engine.session().completed_sessions, 1);
    }

    #[test]
    fn test_growing_duration_updates_countdown() {
        let mut engine = short_engine(60);
        engine.start();
        advance(&mut engine, 30);
        engine.set_duration(120);
        assert_eq!(engine.clock(), Clock::from_seconds(90));
    }

    #[test]
    fn test_countdown_switch_refreshes_clock() {
        let mut engine = engine();
        engine.start();
        advance(&mut engine, 100);
        engine.set_show_countdown(false);
        assert_eq!(engine.clock(), Clock::from_seconds(100));
        engine.set_show_countdown(true);
        assert_eq!(engine.clock(), Clock::from_seconds(1400));
    }

    #[test]
    fn test_completion_happens_exactly_at_duration() {
        for duration in [60, 120, 300] {
            let mut engine = short_engine(duration);
            engine.start();
            advance(&mut engine, duration - 1);
            assert_eq!(engine.session().completed_sessions, 0);
            advance(&mut engine, 1);
            assert_eq!(engine.session().completed_sessions, 1);
            assert_eq!(engine.notifier().messages().len(), 1);
        }
    }

    #[test]
    fn test_dispose_cancels_pending_tick() {
        let mut engine = engine();
        engine.start();
        engine.dispose();
        assert!(!engine.has_pending_tick());
        assert_eq!(engine.scheduler().pending(), 0);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_events_trait_dispatch() {
        let mut engine = engine();
        {
            let events: &mut dyn EngineEvents = &mut engine;
            events.set_show_notifications(false);
            events.start();
            events.reset_session(true);
        }
        assert!(!engine.settings().show_notifications);
        assert_eq!(engine.session(), &SessionState::default());
    }

    #[test]
    fn test_snapshot() {
        let mut engine = engine();
        engine.start();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, TimerState::Running);
        assert_eq!(snapshot.label, " 25:00");
        assert_eq!(snapshot.duration_label, "25 minutes");
        assert_eq!(snapshot.elapsed_seconds, 0);
    }

    #[test]
    fn test_duration_from_fraction() {
        assert_eq!(duration_from_fraction(0.25), 900);
        assert_eq!(duration_from_fraction(1.0), 3600);
        assert_eq!(duration_from_fraction(0.5), 1800);
        // One second past a minute rounds up to the next minute
        assert_eq!(duration_from_fraction(61.0 / 3600.0), 120);
        assert_eq!(duration_from_fraction(1.0 / 3600.0), 60);
        assert_eq!(duration_from_fraction(0.0), 60);
        assert_eq!(duration_from_fraction(2.0), 3600);
        assert_eq!(duration_from_fraction(f64::NAN), 60);
    }
}
