mod client;
mod http_backend;
mod probe;
pub mod responses;
mod service;

pub use client::new_client;
pub use http_backend::HttpBackend;
pub use probe::wait_for_backend;
pub use responses::{AlarmsFingerprint, ScriptStatus};
pub use service::{Backend, BackendError};
