use super::protocol::{ControlCommand, ControlError, ControlResponse};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

/// A command waiting to be applied on the applet's event loop.
#[derive(Debug)]
pub struct ControlRequest {
    pub command: ControlCommand,
    pub reply: oneshot::Sender<ControlResponse>,
}

pub type ControlSender = mpsc::UnboundedSender<ControlRequest>;
pub type ControlReceiver = mpsc::UnboundedReceiver<ControlRequest>;

pub fn create_control_channel() -> (ControlSender, ControlReceiver) {
    mpsc::unbounded_channel()
}

/// Bind the control socket. Done up front so a second instance fails before it starts.
pub async fn bind_control_socket(addr: SocketAddr) -> Result<TcpListener, ControlError> {
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ControlError::Bind { addr, source })
}

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, control_tx: ControlSender) -> Result<(), ControlError> {
    if let Ok(addr) = listener.local_addr() {
        info!("Control socket listening on ws://{}", addr);
    }

    while let Ok((stream, peer_addr)) = listener.accept().await {
        debug!("New control connection from {}", peer_addr);
        let tx = control_tx.clone();
        tokio::spawn(handle_connection(stream, peer_addr, tx));
    }

    Ok(())
}

async fn dispatch(text: &str, control_tx: &ControlSender) -> ControlResponse {
    let command = match serde_json::from_str::<ControlCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            warn!("Failed to parse control message: {}", e);
            return ControlResponse::error(format!("Parse error: {}", e));
        }
    };

    debug!("Control command: {:?}", command);
    let (reply_tx, reply_rx) = oneshot::channel();
    let request = ControlRequest {
        command,
        reply: reply_tx,
    };
    if control_tx.send(request).is_err() {
        return ControlResponse::error("Applet is shutting down");
    }

    reply_rx
        .await
        .unwrap_or_else(|_| ControlResponse::error("Applet dropped the request"))
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, control_tx: ControlSender) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed with {}: {}", peer_addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = dispatch(&text, &control_tx).await;
                match serde_json::to_string(&response) {
                    Ok(response_json) => {
                        if let Err(e) = ws_sender.send(Message::Text(response_json)).await {
                            warn!("Failed to send control response: {}", e);
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to encode control response: {}", e),
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Control connection closed by {}", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                    warn!("Failed to send pong: {}", e);
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    debug!("Control connection with {} terminated", peer_addr);
}
