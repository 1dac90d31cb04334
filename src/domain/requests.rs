use crate::domain::alarm::AlarmTime;
use crate::domain::hardware::ComponentTest;

/// Commands the client sends to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListAlarms,
    AddAlarm(AlarmTime),
    DeleteAlarm { index: usize },
    ToggleAlarm { index: usize },
    Snooze,
    SensorData,
    TestHardware(ComponentTest),
    StartScript,
    StopScript,
    ScriptStatus,
    HardwareStatus,
}
