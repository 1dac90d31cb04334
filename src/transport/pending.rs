use crate::domain::{ComponentTest, HardwareResponse};
use tokio::sync::oneshot;
use tracing::debug;

/// A hardware test published on the push channel, waiting for its `alarm/hardware/response`.
/// Responses carry no correlation id, so only the latest test is kept.
#[derive(Debug)]
pub struct PendingRequest {
    test: ComponentTest,
    reply: oneshot::Sender<HardwareResponse>,
}

impl PendingRequest {
    pub fn new(test: ComponentTest) -> (Self, oneshot::Receiver<HardwareResponse>) {
        let (reply, rx) = oneshot::channel();
        (PendingRequest { test, reply }, rx)
    }

    pub fn test(&self) -> &ComponentTest {
        &self.test
    }

    /// The waiter gave up, typically after its timeout elapsed.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }

    pub fn resolve(self, response: HardwareResponse) {
        if self.reply.send(response).is_err() {
            debug!(component = %self.test.component, "Hardware response arrived after the test was abandoned");
        }
    }
}
