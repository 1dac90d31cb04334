pub mod alarm;
pub mod alarm_state;
pub mod connection_state;
pub mod events;
pub mod hardware;
pub mod requests;
pub mod sensor;

pub use alarm::{AlarmEntry, AlarmTime, ValidationError};
pub use alarm_state::AlarmActiveState;
pub use connection_state::ConnectionState;
pub use hardware::{ComponentTest, HardwareResponse, HardwareStatus, HardwareTestEndpoint, TestState};
pub use requests::Request;
pub use sensor::SensorSnapshot;
