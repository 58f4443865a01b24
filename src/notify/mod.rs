use notify_rust::Notification;
use tracing::{debug, warn};

/// Sink for user-facing messages.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Desktop notifications through the freedesktop notification service.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    summary: String,
}

impl DesktopNotifier {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("Pomodoro")
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&mut self, message: &str) {
        debug!("Showing notification: {}", message);
        if let Err(e) = Notification::new()
            .summary(&self.summary)
            .body(message)
            .show()
        {
            warn!("Failed to send notification: {}", e);
        }
    }
}

/// Keeps every message in memory instead of showing it.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    messages: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
