use crate::domain::alarm::AlarmEntry;
use crate::domain::alarm_state::AlarmActiveState;
use crate::domain::hardware::HardwareResponse;
use crate::domain::sensor::SensorSnapshot;

/// Updates flowing into the state reconciler, whichever channel they arrived on.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AlarmListReceived(Vec<AlarmEntry>),
    SensorSnapshotReceived(SensorSnapshot),
    AlarmStateReceived(AlarmActiveState),
    OutputReceived(Vec<String>),
    BackendMessage(String),
    BackendError(String),
    HardwareResponseReceived(HardwareResponse),
}

/// Transient things for the user to see. Unlike the model these are not kept.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Output(String),
    Info(String),
    Error(String),
    ShowNotification(String),
    HideNotification,
    HardwareResponse(HardwareResponse),
}
