use crate::backend::BackendError;
use crate::domain::AlarmEntry;
use serde::Deserialize;

/// The `{status, message}` envelope most mutating endpoints answer with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn into_result(self) -> Result<Option<String>, BackendError> {
        if self.status == "success" {
            Ok(self.message)
        } else {
            Err(BackendError::Rejected(self.message.unwrap_or_else(|| format!("status '{}'", self.status))))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AlarmsResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub alarms: Vec<AlarmEntry>,
}

/// Modification marker of the backend's alarm file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlarmsFingerprint {
    pub timestamp: f64,
    pub content_hash: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputResponse {
    #[serde(default)]
    pub output: Vec<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptStatus {
    pub script_running: bool,
    #[serde(default)]
    pub interface_running: bool,
    #[serde(default)]
    pub server_time: Option<String>,
}
