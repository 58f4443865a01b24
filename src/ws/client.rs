use super::protocol::{ControlCommand, ControlError, ControlResponse};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Send one command to a running applet and wait for its answer.
pub async fn send_command(
    addr: SocketAddr,
    command: &ControlCommand,
) -> Result<ControlResponse, ControlError> {
    let url = format!("ws://{}", addr);
    let (mut ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;

    ws_stream
        .send(Message::Text(serde_json::to_string(command)?))
        .await?;

    while let Some(msg) = ws_stream.next().await {
        match msg? {
            Message::Text(text) => {
                let response = serde_json::from_str(&text)?;
                let _ = ws_stream.close(None).await;
                return Ok(response);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(ControlError::Closed)
}
