use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

mod decode;

pub use decode::{StateWord, decode};

/// Light colour mode derived from the cool and warm LED flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    None,
    Cool,
    Warm,
    Daylight,
}

impl Color {
    pub fn from_flags(cool: bool, warm: bool) -> Self {
        match (cool, warm) {
            (true, true) => Color::Daylight,
            (true, false) => Color::Cool,
            (false, true) => Color::Warm,
            (false, false) => Color::None,
        }
    }
}

/// Decoded fan attributes carried by a single state word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanState {
    pub power: bool,
    pub led: bool,
    pub sleep: bool,
    /// Fan speed level, 0-7.
    pub speed: u8,
    /// Timer setting code, 0-15.
    pub fan_timer: u8,
    /// Elapsed timer minutes in steps of 4, 0-1020.
    pub fan_timer_elapsed_mins: u16,
    /// Light brightness level, 0-127.
    pub brightness: u8,
    pub color: Color,
}

impl From<StateWord> for FanState {
    fn from(word: StateWord) -> Self {
        Self {
            power: word.power(),
            led: word.led(),
            sleep: word.sleep(),
            speed: word.speed(),
            fan_timer: word.fan_timer(),
            fan_timer_elapsed_mins: word.fan_timer_elapsed_mins(),
            brightness: word.brightness(),
            color: word.color(),
        }
    }
}

/// State of one device as reported by a telemetry packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Device identifier exactly as sent. `None` only when the key was
    /// missing; an explicit `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_id: Option<Value>,
    #[serde(flatten)]
    pub fan: FanState,
}

impl DeviceState {
    pub fn decode(device_id: Option<Value>, state_string: &str) -> Self {
        Self {
            device_id,
            fan: decode(state_string),
        }
    }
}

/// Deserializes a field that is present in the input, whatever its JSON
/// type, as `Some(value)`. Pair with `#[serde(default)]` so that a missing
/// key stays `None` while `null` becomes `Some(Value::Null)`.
pub fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
