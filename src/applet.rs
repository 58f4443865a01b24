//! The applet: one engine, one config store, one event loop.

use crate::config::{ConfigStore, clamp_duration};
use crate::notify::Notifier;
use crate::pomodoro::{Engine, EngineEvents, duration_from_fraction};
use crate::scheduler::{Scheduler, TickReceiver};
use crate::ws::{ControlCommand, ControlReceiver, ControlResponse};
use std::future::Future;
use tracing::{debug, error, info};

/// An [`Engine`] paired with the [`ConfigStore`] its settings live in.
///
/// Every settings change made through [`EngineEvents`] is written back to the
/// store. Write failures are logged and the in-memory settings stay in effect.
pub struct Applet<S: Scheduler, N: Notifier> {
    engine: Engine<S, N>,
    store: ConfigStore,
}

impl<S: Scheduler, N: Notifier> Applet<S, N> {
    /// Load settings from `store` and build a stopped engine around them.
    pub fn init(store: ConfigStore, scheduler: S, notifier: N) -> Self {
        let settings = store.load();
        info!(
            "Loaded settings from {:?}: {}s pomodoro, countdown={}, notifications={}",
            store.path(),
            settings.pomodoro_duration,
            settings.show_countdown,
            settings.show_notifications
        );
        Self {
            engine: Engine::new(settings, scheduler, notifier),
            store,
        }
    }

    pub fn engine(&self) -> &Engine<S, N> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<S, N> {
        &mut self.engine
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Cancel the pending tick. Nothing fires after this returns.
    pub fn dispose(&mut self) {
        debug!("Disposing applet");
        self.engine.dispose();
    }

    /// Apply one control command and describe the resulting state.
    pub fn handle(&mut self, command: ControlCommand) -> ControlResponse {
        match command {
            ControlCommand::Toggle => self.toggle(),
            ControlCommand::Start => self.start(),
            ControlCommand::Stop => self.stop(),
            ControlCommand::Reset { reset_count } => self.reset_session(reset_count),
            ControlCommand::SetDuration { seconds: 0 } => {
                return ControlResponse::error("Duration must be at least one second");
            }
            ControlCommand::SetDuration { seconds } if clamp_duration(seconds) < seconds => {
                return ControlResponse::error(format!(
                    "Duration must be at most {} seconds",
                    clamp_duration(u32::MAX)
                ));
            }
            ControlCommand::SetDuration { seconds } => self.set_duration(seconds),
            ControlCommand::SetDurationFraction { fraction } => {
                if !fraction.is_finite() {
                    return ControlResponse::error("Fraction must be a number between 0 and 1");
                }
                self.set_duration(duration_from_fraction(fraction));
            }
            ControlCommand::SetShowCountdown { enabled } => self.set_show_countdown(enabled),
            ControlCommand::SetShowNotifications { enabled } => {
                self.set_show_notifications(enabled)
            }
            ControlCommand::Status => {}
        }
        ControlResponse::ok(self.engine.snapshot())
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(self.engine.settings()) {
            error!("Error writing config file: {}", e);
        }
    }
}

impl<S: Scheduler, N: Notifier> EngineEvents for Applet<S, N> {
    fn start(&mut self) {
        self.engine.start();
    }

    fn stop(&mut self) {
        self.engine.stop();
    }

    fn toggle(&mut self) {
        self.engine.toggle();
    }

    /// Rounded up to whole minutes, at least one minute.
    fn set_duration(&mut self, seconds: u32) {
        self.engine.set_duration(clamp_duration(seconds));
        self.persist();
    }

    fn set_show_countdown(&mut self, enabled: bool) {
        self.engine.set_show_countdown(enabled);
        self.persist();
    }

    fn set_show_notifications(&mut self, enabled: bool) {
        self.engine.set_show_notifications(enabled);
        self.persist();
    }

    fn reset_session(&mut self, reset_count: bool) {
        self.engine.reset(reset_count);
    }
}

/// Drive the applet until `shutdown` resolves.
///
/// Ticks and control requests are handled one at a time on the calling task.
/// `on_label` receives the initial panel label and then every label that
/// differs from the previous one. The applet is disposed before returning.
pub async fn run<S, N>(
    applet: &mut Applet<S, N>,
    mut ticks: TickReceiver,
    mut controls: ControlReceiver,
    shutdown: impl Future<Output = ()>,
    mut on_label: impl FnMut(&str),
) where
    S: Scheduler,
    N: Notifier,
{
    tokio::pin!(shutdown);

    let mut last_label = applet.engine().label();
    on_label(&last_label);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            Some(handle) = ticks.recv() => applet.engine_mut().on_tick(handle),
            Some(request) = controls.recv() => {
                let response = applet.handle(request.command);
                let _ = request.reply.send(response);
            }
            else => break,
        }

        let label = applet.engine().label();
        if label != last_label {
            on_label(&label);
            last_label = label;
        }
    }

    applet.dispose();
}
