use crate::backend::responses::{AlarmsFingerprint, OutputResponse, ScriptStatus, StatusResponse};
use crate::domain::{AlarmActiveState, AlarmEntry, AlarmTime, ComponentTest, HardwareResponse, HardwareStatus, HardwareTestEndpoint, SensorSnapshot};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

/// The HTTP side of the backend, one method per endpoint.
#[async_trait]
pub trait Backend: Debug + Send + Sync {
    async fn alarms(&self) -> Result<Vec<AlarmEntry>, BackendError>;

    async fn alarms_fingerprint(&self) -> Result<AlarmsFingerprint, BackendError>;

    async fn add_alarm(&self, time: AlarmTime) -> Result<StatusResponse, BackendError>;

    async fn delete_alarm(&self, index: usize) -> Result<StatusResponse, BackendError>;

    async fn toggle_alarm(&self, index: usize) -> Result<StatusResponse, BackendError>;

    async fn alarm_state(&self) -> Result<AlarmActiveState, BackendError>;

    async fn snooze(&self) -> Result<StatusResponse, BackendError>;

    async fn sensor_data(&self) -> Result<SensorSnapshot, BackendError>;

    async fn hardware_status(&self) -> Result<HardwareStatus, BackendError>;

    async fn test_hardware(&self, endpoint: HardwareTestEndpoint, test: &ComponentTest) -> Result<HardwareResponse, BackendError>;

    async fn output(&self) -> Result<OutputResponse, BackendError>;

    async fn start_script(&self) -> Result<StatusResponse, BackendError>;

    async fn stop_script(&self) -> Result<StatusResponse, BackendError>;

    async fn script_status(&self) -> Result<ScriptStatus, BackendError>;
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} answered with HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("{0}")]
    Rejected(String),
}

impl BackendError {
    /// True when the request never got a usable answer, as opposed to the backend refusing it.
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Request { .. } | BackendError::Status { .. })
    }
}
