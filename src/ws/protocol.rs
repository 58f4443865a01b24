use crate::pomodoro::Snapshot;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:8765";

/// One menu action, as sent over the control socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    Toggle,
    Start,
    Stop,
    Reset {
        #[serde(default = "default_reset_count")]
        reset_count: bool,
    },
    SetDuration {
        seconds: u32,
    },
    /// Slider position in 0..1, mapped onto 0..60 minutes
    SetDurationFraction {
        fraction: f64,
    },
    SetShowCountdown {
        enabled: bool,
    },
    SetShowNotifications {
        enabled: bool,
    },
    Status,
}

fn default_reset_count() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: Option<String>,
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
}

impl ControlResponse {
    pub fn ok(snapshot: Snapshot) -> Self {
        Self {
            success: true,
            message: None,
            snapshot: Some(snapshot),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            snapshot: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to bind control socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("invalid control message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("connection closed before a response arrived")]
    Closed,
}
