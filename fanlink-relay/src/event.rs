use fanlink_core::DeviceState;
use serde::Serialize;

/// Event pushed to every connected subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    FanState(FanStateEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanStateEvent {
    /// Trimmed hex text exactly as received.
    #[serde(rename = "rawHex")]
    pub raw_hex: String,
    /// Payload recovered from `raw_hex`.
    #[serde(rename = "rawAscii")]
    pub raw_ascii: String,
    #[serde(flatten)]
    pub state: DeviceState,
}

impl From<FanStateEvent> for RelayEvent {
    fn from(event: FanStateEvent) -> Self {
        RelayEvent::FanState(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_state_event_wire_format() {
        let event = RelayEvent::from(FanStateEvent {
            raw_hex: "7b7d".into(),
            raw_ascii: "{}".into(),
            state: DeviceState::decode(Some("dev1".into()), "2560"),
        });

        let json = serde_json::to_value(&event).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(json["type"], "fan_state");
        assert_eq!(json["rawHex"], "7b7d");
        assert_eq!(json["rawAscii"], "{}");
        assert_eq!(json["device_id"], "dev1");
        assert_eq!(json["brightness"], 10);
        assert_eq!(json["color"], "none");

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "brightness",
                "color",
                "device_id",
                "fanTimer",
                "fanTimerElapsedMins",
                "led",
                "power",
                "rawAscii",
                "rawHex",
                "sleep",
                "speed",
                "type",
            ]
        );
    }
}
