//! Socket.IO 0.9 control-frame codec.
//!
//! Frames use the `type:[id]:[endpoint][:data]` envelope. This module decodes
//! only as far as the state machine needs: it distinguishes protocol-control
//! frames (connect ack, heartbeat, disconnect, error) from application
//! messages and threads the JSON flag through from the frame type. Message
//! payloads are opaque and never parsed.
//!
//! Acknowledgement ids and endpoint qualifiers are parsed past but never
//! interpreted.

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Server-initiated disconnect (`0::`).
    Disconnect,
    /// Connect acknowledgement (`1::`).
    Connect,
    /// Heartbeat (`2::`); must be echoed back to keep the session alive.
    Heartbeat,
    /// An application message; `is_json` reflects the frame type
    /// (`3` plain, `4` JSON-encoded), not the payload contents.
    Message { payload: String, is_json: bool },
    /// Server error report (`7:::reason`).
    Error(String),
    /// Anything this client does not understand, kept verbatim.
    Unknown(String),
}

/// Decode a raw frame delivered by the transport.
pub fn decode(raw: &str) -> Frame {
    let mut parts = raw.splitn(4, ':');
    let kind = parts.next().unwrap_or("");
    let _id = parts.next();
    let _endpoint = parts.next();
    let data = parts.next().unwrap_or("");

    match kind {
        "0" => Frame::Disconnect,
        "1" => Frame::Connect,
        "2" => Frame::Heartbeat,
        "3" => Frame::Message {
            payload: data.to_string(),
            is_json: false,
        },
        "4" => Frame::Message {
            payload: data.to_string(),
            is_json: true,
        },
        "7" => Frame::Error(data.to_string()),
        _ => Frame::Unknown(raw.to_string()),
    }
}

/// Encode an outbound application message.
///
/// The payload is passed through untouched; `is_json` only selects the
/// frame type.
pub fn encode_message(payload: &str, is_json: bool) -> String {
    if is_json {
        format!("4:::{payload}")
    } else {
        format!("3:::{payload}")
    }
}

/// Encode a heartbeat echo.
pub fn encode_heartbeat() -> String {
    "2::".to_string()
}
