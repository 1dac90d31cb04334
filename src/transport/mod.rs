mod coordinator;
mod pending;
mod pollers;
mod settings;
mod timer_registry;

pub use coordinator::{Delivery, SendError, TransportCoordinator};
pub use settings::TransportSettings;
