pub mod client;
pub mod protocol;
pub mod websocket_server;

pub use client::send_command;
pub use protocol::{ControlCommand, ControlError, ControlResponse, DEFAULT_CONTROL_ADDR};
pub use websocket_server::{
    ControlReceiver, ControlRequest, ControlSender, bind_control_socket, create_control_channel,
    serve,
};
