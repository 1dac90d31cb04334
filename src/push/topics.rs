//! Topic names of the alarm broker and the typed view of what arrives on them.

use crate::domain::{AlarmActiveState, AlarmEntry, HardwareResponse, Request, SensorSnapshot};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

pub const ALARM_LIST: &str = "alarm/list";
pub const ALARM_ADDED: &str = "alarm/added";
pub const ALARM_DELETED: &str = "alarm/deleted";
pub const ALARM_TOGGLED: &str = "alarm/toggled";
pub const ALARM_STATE: &str = "alarm/state";
pub const ALARM_OUTPUT: &str = "alarm/output";
pub const ALARM_ERROR: &str = "alarm/error";
pub const SENSOR_DATA: &str = "alarm/sensor/data";
pub const HARDWARE_RESPONSE: &str = "alarm/hardware/response";

pub const REQUEST_LIST: &str = "alarm/request/list";
pub const REQUEST_ADD: &str = "alarm/request/add";
pub const REQUEST_DELETE: &str = "alarm/request/delete";
pub const REQUEST_TOGGLE: &str = "alarm/request/toggle";
pub const REQUEST_SNOOZE: &str = "alarm/request/snooze";
pub const REQUEST_SENSOR: &str = "alarm/request/sensor";
pub const REQUEST_HARDWARE: &str = "alarm/request/hardware";

pub const SUBSCRIPTIONS: [&str; 9] = [
    ALARM_LIST,
    ALARM_ADDED,
    ALARM_DELETED,
    ALARM_TOGGLED,
    ALARM_STATE,
    ALARM_OUTPUT,
    ALARM_ERROR,
    SENSOR_DATA,
    HARDWARE_RESPONSE,
];

#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    AlarmList(Vec<AlarmEntry>),
    AlarmAdded(String),
    AlarmDeleted(String),
    AlarmToggled(String),
    AlarmState(AlarmActiveState),
    Output(String),
    Error(String),
    SensorData(SensorSnapshot),
    HardwareResponse(HardwareResponse),
    Unknown { topic: String },
}

impl IncomingMessage {
    pub fn parse(topic: &str, payload: &str) -> Result<Self, ParseError> {
        let message = match topic {
            ALARM_LIST => IncomingMessage::AlarmList(from_json(topic, payload)?),
            ALARM_ADDED => IncomingMessage::AlarmAdded(message_text(payload, "Alarm added")),
            ALARM_DELETED => IncomingMessage::AlarmDeleted(message_text(payload, "Alarm deleted")),
            ALARM_TOGGLED => IncomingMessage::AlarmToggled(message_text(payload, "Alarm toggled")),
            ALARM_STATE => IncomingMessage::AlarmState(from_json(topic, payload)?),
            ALARM_OUTPUT => IncomingMessage::Output(message_text(payload, "Output received")),
            ALARM_ERROR => IncomingMessage::Error(message_text(payload, "Unknown error")),
            SENSOR_DATA => IncomingMessage::SensorData(from_json(topic, payload)?),
            HARDWARE_RESPONSE => IncomingMessage::HardwareResponse(from_json(topic, payload)?),
            _ => IncomingMessage::Unknown { topic: topic.to_string() },
        };

        Ok(message)
    }

    /// Confirmations of list-affecting commands, after which the list is re-requested.
    pub fn confirms_list_change(&self) -> bool {
        matches!(self, IncomingMessage::AlarmAdded(_) | IncomingMessage::AlarmDeleted(_) | IncomingMessage::AlarmToggled(_))
    }
}

/// Topic and payload to publish for a request, `None` for HTTP-only requests.
pub fn outgoing(request: &Request) -> Option<(&'static str, String)> {
    let (topic, payload) = match request {
        Request::ListAlarms => (REQUEST_LIST, json!({})),
        Request::AddAlarm(time) => (
            REQUEST_ADD,
            json!({ "hour": time.hour(), "minute": time.minute(), "second": time.second() }),
        ),
        Request::DeleteAlarm { index } => (REQUEST_DELETE, json!({ "index": index })),
        Request::ToggleAlarm { index } => (REQUEST_TOGGLE, json!({ "index": index })),
        Request::Snooze => (REQUEST_SNOOZE, json!({})),
        Request::SensorData => (REQUEST_SENSOR, json!({})),
        Request::TestHardware(test) => (REQUEST_HARDWARE, json!({ "component": test.component, "action": test.action })),
        Request::StartScript | Request::StopScript | Request::ScriptStatus | Request::HardwareStatus => return None,
    };

    Some((topic, payload.to_string()))
}

fn from_json<T: DeserializeOwned>(topic: &str, payload: &str) -> Result<T, ParseError> {
    serde_json::from_str(payload).map_err(|source| ParseError::Malformed {
        topic: topic.to_string(),
        source,
    })
}

// Text topics carry a JSON string, a `{message}` object or plain text
fn message_text(payload: &str, default: &str) -> String {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::String(text)) if !text.is_empty() => text,
        Ok(Value::Object(object)) => object
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or(default)
            .to_string(),
        Ok(_) => default.to_string(),
        Err(_) if !payload.trim().is_empty() => payload.trim().to_string(),
        Err(_) => default.to_string(),
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed payload on '{topic}': {source}")]
    Malformed {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
}
