use fanlink_core::{DeviceState, deserialize_present};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::event::FanStateEvent;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("datagram is not valid utf-8: {0}")]
    Text(#[from] std::str::Utf8Error),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("decoded payload is not valid utf-8: {0}")]
    Payload(#[from] std::string::FromUtf8Error),
    #[error("invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// JSON object carried inside a telemetry datagram.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Relayed verbatim, whatever its JSON type.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub device_id: Option<Value>,
    pub state_string: String,
}

impl Envelope {
    /// Parses a payload that must be a JSON object.
    pub fn parse(payload: &str) -> Result<Self, PacketError> {
        let object: Map<String, Value> = serde_json::from_str(payload)?;
        Ok(Envelope::deserialize(Value::Object(object))?)
    }
}

/// Turns a raw datagram into a fan state event.
///
/// The datagram is hex text (surrounding whitespace ignored) encoding a
/// UTF-8 JSON [`Envelope`].
pub fn transcode(datagram: &[u8]) -> Result<FanStateEvent, PacketError> {
    let raw_hex = std::str::from_utf8(datagram)?.trim();
    let raw_ascii = String::from_utf8(hex::decode(raw_hex)?)?;
    let envelope = Envelope::parse(&raw_ascii)?;

    let state = DeviceState::decode(envelope.device_id, &envelope.state_string);

    Ok(FanStateEvent {
        raw_hex: raw_hex.to_owned(),
        raw_ascii,
        state,
    })
}
