use crate::backend::ScriptStatus;
use crate::domain::events::Event;
use crate::domain::{AlarmActiveState, AlarmTime, ComponentTest, ConnectionState, HardwareStatus, Request, TestState, ValidationError};
use crate::transport::{Delivery, SendError, TransportCoordinator};
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, instrument, warn};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("unexpected reply: {0:?}")]
    Unexpected(Delivery),
}

/// One operation per user command. Input is validated before anything is sent, and commands that change
/// the alarm list are followed by a list refresh.
#[derive(Debug)]
pub struct ActionDispatcher {
    coordinator: TransportCoordinator,
    events: Sender<Event>,
    test_state: watch::Sender<TestState>,
}

impl ActionDispatcher {
    pub fn new(coordinator: TransportCoordinator, events: Sender<Event>) -> Self {
        let (test_state, _) = watch::channel(TestState::Idle);

        ActionDispatcher {
            coordinator,
            events,
            test_state,
        }
    }

    /// Current component test state followed by every transition.
    pub fn test_states(&self) -> WatchStream<TestState> {
        WatchStream::new(self.test_state.subscribe())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.coordinator.state()
    }

    #[instrument(skip(self))]
    pub async fn add_alarm(&self, hour: u32, minute: u32, second: u32) -> Result<Option<String>, DispatchError> {
        let time = AlarmTime::new(hour, minute, second)?;
        self.change_alarms(Request::AddAlarm(time)).await
    }

    #[instrument(skip(self))]
    pub async fn delete_alarm(&self, index: usize) -> Result<Option<String>, DispatchError> {
        self.change_alarms(Request::DeleteAlarm { index }).await
    }

    #[instrument(skip(self))]
    pub async fn toggle_alarm(&self, index: usize) -> Result<Option<String>, DispatchError> {
        self.change_alarms(Request::ToggleAlarm { index }).await
    }

    /// Snoozes the ringing alarm and hides the notification without waiting for the next state update.
    #[instrument(skip(self))]
    pub async fn snooze(&self) -> Result<Option<String>, DispatchError> {
        let message = completed(self.coordinator.send(Request::Snooze).await?);

        if self.events.send(Event::AlarmStateReceived(AlarmActiveState::inactive())).await.is_err() {
            debug!("Event receiver is gone, notification stays as is");
        }
        Ok(message)
    }

    /// Runs one component test. Moves the test state to `Testing`, then to `Success` or `Failed`.
    #[instrument(skip(self))]
    pub async fn test_component(&self, component: &str, action: &str) -> TestState {
        self.test_state.send_replace(TestState::Testing {
            component: component.to_string(),
        });

        let outcome = match self.coordinator.send(Request::TestHardware(ComponentTest::new(component, action))).await {
            Ok(Delivery::Hardware(response)) if response.is_success() => TestState::Success {
                component: component.to_string(),
                message: response.describe(component),
            },
            Ok(Delivery::Hardware(response)) => TestState::Failed {
                component: component.to_string(),
                message: response.message.unwrap_or_else(|| format!("{component} test failed")),
            },
            Ok(other) => TestState::Failed {
                component: component.to_string(),
                message: format!("unexpected reply: {other:?}"),
            },
            Err(SendError::AllAttemptsFailed { last_error }) => TestState::Failed {
                component: component.to_string(),
                message: format!("All attempts failed, last error: {last_error}"),
            },
            Err(e) => TestState::Failed {
                component: component.to_string(),
                message: e.to_string(),
            },
        };

        self.test_state.send_replace(outcome.clone());
        outcome
    }

    /// Asks for the full alarm list. Over HTTP the list is applied right away, over the push channel it
    /// arrives as an update.
    pub async fn refresh_alarms(&self) -> Result<(), DispatchError> {
        self.coordinator.send(Request::ListAlarms).await?;
        Ok(())
    }

    pub async fn request_sensors(&self) -> Result<(), DispatchError> {
        self.coordinator.send(Request::SensorData).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn start_script(&self) -> Result<Option<String>, DispatchError> {
        Ok(completed(self.coordinator.send(Request::StartScript).await?))
    }

    #[instrument(skip(self))]
    pub async fn stop_script(&self) -> Result<Option<String>, DispatchError> {
        Ok(completed(self.coordinator.send(Request::StopScript).await?))
    }

    pub async fn script_status(&self) -> Result<ScriptStatus, DispatchError> {
        match self.coordinator.send(Request::ScriptStatus).await? {
            Delivery::ScriptStatus(status) => Ok(status),
            other => Err(DispatchError::Unexpected(other)),
        }
    }

    pub async fn hardware_status(&self) -> Result<HardwareStatus, DispatchError> {
        match self.coordinator.send(Request::HardwareStatus).await? {
            Delivery::HardwareStatus(status) => Ok(status),
            other => Err(DispatchError::Unexpected(other)),
        }
    }

    pub async fn connect(&self) -> ConnectionState {
        self.coordinator.connect().await
    }

    pub async fn disconnect(&self) {
        self.coordinator.disconnect().await;
    }

    async fn change_alarms(&self, request: Request) -> Result<Option<String>, DispatchError> {
        let message = completed(self.coordinator.send(request).await?);

        if let Err(e) = self.refresh_alarms().await {
            warn!("⚠️ Could not refresh alarms: {}", e);
        }
        Ok(message)
    }
}

fn completed(delivery: Delivery) -> Option<String> {
    match delivery {
        Delivery::Completed(message) => message,
        _ => None,
    }
}
