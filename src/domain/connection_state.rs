use std::fmt;

/// Which channel currently drives state updates. `Connected` means the push channel does,
/// anything else means polling does.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Degraded(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("Disconnected"),
            ConnectionState::Connecting => f.write_str("Connecting"),
            ConnectionState::Connected => f.write_str("Connected"),
            ConnectionState::Degraded(reason) => write!(f, "Degraded ({reason})"),
        }
    }
}
