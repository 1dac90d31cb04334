mod channel;
mod mqtt;
pub mod topics;

pub use channel::{PushChannel, PushEvent, TransportError};
pub use mqtt::{MqttPushChannel, MqttSettings};
pub use topics::IncomingMessage;
