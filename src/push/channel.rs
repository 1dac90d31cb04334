use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;

/// Traffic delivered by a live push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Message { topic: String, payload: String },
    ConnectionLost(String),
}

/// A publish/subscribe transport. Inbound traffic for a session is delivered on the sender handed to `connect`.
#[async_trait]
pub trait PushChannel: Debug + Send + Sync {
    /// Performs the handshake. Returns once the broker accepted the session.
    async fn connect(&self, events: Sender<PushEvent>) -> Result<(), TransportError>;

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError>;

    async fn disconnect(&self);
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("connection attempt timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("push channel is not connected")]
    NotConnected,
    #[error("could not subscribe to '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("could not publish to '{topic}': {reason}")]
    Publish { topic: String, reason: String },
    #[error("no response within {}s", .0.as_secs())]
    NoResponse(Duration),
    #[error("request was abandoned before a response arrived")]
    Abandoned,
}
