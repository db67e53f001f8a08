//! Control frames exchanged with the live-view middleware.
//!
//! Text messages on the stream socket are JSON envelopes of the form
//! `{"command": "...", "data": {...}}`. Binary messages are raw media
//! segments and never pass through this module's parser.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resolver::StreamConnectionDescriptor;
use crate::protocol_constants::{LIVEVIEW_START_COMMAND, LIVEVIEW_STOP_COMMAND};

/// Errors raised while decoding a text frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The text was not a JSON control envelope.
    #[error("Malformed control frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Command carried by a control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    #[serde(rename = "liveview:start", alias = "start")]
    Start,
    #[serde(rename = "liveview:stop", alias = "stop")]
    Stop,
    /// Any command this client does not act upon.
    #[serde(other)]
    Unknown,
}

/// Outgoing control envelope.
#[derive(Debug, Serialize)]
struct OutgoingFrame<'a, T: Serialize> {
    command: &'a str,
    data: T,
}

/// Incoming control envelope. The payload is not needed by the client.
#[derive(Debug, Deserialize)]
struct IncomingFrame {
    command: ControlCommand,
}

/// Payload of the start request.
#[derive(Debug, Serialize)]
struct StartPayload<'a> {
    account_region: &'a str,
    api_token: &'a str,
    account_id: &'a str,
    network_id: &'a str,
    camera_id: &'a str,
    camera_type: &'a str,
}

/// Builds the start control frame for a descriptor.
pub fn start_frame(descriptor: &StreamConnectionDescriptor) -> Result<String, FrameError> {
    let frame = OutgoingFrame {
        command: LIVEVIEW_START_COMMAND,
        data: StartPayload {
            account_region: &descriptor.region,
            api_token: descriptor.token(),
            account_id: &descriptor.account_id,
            network_id: &descriptor.network_id,
            camera_id: &descriptor.camera_id,
            camera_type: &descriptor.camera_type,
        },
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Builds the stop control frame.
pub fn stop_frame() -> String {
    // Static payload, serialization cannot fail
    format!(r#"{{"command":"{}","data":{{}}}}"#, LIVEVIEW_STOP_COMMAND)
}

/// Decodes the command of a text frame.
pub fn parse_control(text: &str) -> Result<ControlCommand, FrameError> {
    let frame: IncomingFrame = serde_json::from_str(text)?;
    Ok(frame.command)
}

/// Classification of one inbound socket message.
#[derive(Debug)]
pub enum InboundFrame {
    /// A media segment, to be appended to the sink.
    Data(Bytes),
    /// A decoded control frame.
    Control(ControlCommand),
    /// A text frame that could not be decoded.
    Malformed(FrameError),
}

impl InboundFrame {
    /// Classifies a text message.
    pub fn from_text(text: &str) -> Self {
        match parse_control(text) {
            Ok(command) => Self::Control(command),
            Err(e) => Self::Malformed(e),
        }
    }
}
