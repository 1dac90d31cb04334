use serde::Deserialize;

const DEFAULT_MESSAGE: &str = "Alarm activated";

/// Whether an alarm is currently ringing.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AlarmActiveState {
    #[serde(rename = "alarm_active", alias = "active", default)]
    pub active: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl AlarmActiveState {
    pub fn active(message: impl Into<String>) -> Self {
        AlarmActiveState {
            active: true,
            message: Some(message.into()),
        }
    }

    pub fn inactive() -> Self {
        AlarmActiveState::default()
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().filter(|message| !message.is_empty()).unwrap_or(DEFAULT_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_the_backend_state_file_format() {
        let state = serde_json::from_value::<AlarmActiveState>(json!({
            "alarm_active": true,
            "timestamp": 1718000000.0,
            "message": "Wake up!"
        }))
        .unwrap();

        assert_eq!(state, AlarmActiveState::active("Wake up!"));
    }

    #[test]
    fn falls_back_to_a_default_message() {
        let state = serde_json::from_value::<AlarmActiveState>(json!({ "active": true, "message": "" })).unwrap();

        assert!(state.active);
        assert_eq!(state.message_or_default(), "Alarm activated");
    }
}
