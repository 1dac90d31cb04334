use crate::backend::{Backend, BackendError, ScriptStatus};
use crate::domain::events::Event;
use crate::domain::{ComponentTest, ConnectionState, HardwareResponse, HardwareStatus, Request};
use crate::push::{IncomingMessage, PushChannel, PushEvent, TransportError, topics};
use crate::transport::pending::PendingRequest;
use crate::transport::pollers;
use crate::transport::settings::TransportSettings;
use crate::transport::timer_registry::{Job, TimerRegistry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, timeout};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, instrument, trace, warn};

const PUSH_BUFFER_SIZE: usize = 64;

/// What a successfully sent request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Published on the push channel. Any answer arrives later as an update.
    Published,
    /// Answered over HTTP, with the backend's message if it sent one.
    Completed(Option<String>),
    Hardware(HardwareResponse),
    ScriptStatus(ScriptStatus),
    HardwareStatus(HardwareStatus),
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("All attempts failed")]
    AllAttemptsFailed { last_error: String },
}

/// Decides whether the push channel or HTTP polling drives state updates.
///
/// While `Connected` the push channel is the only source of updates and no polling job runs. In any
/// other state the polling jobs run and, unless the client disconnected on purpose, one reconnect is
/// scheduled after the reconnect delay.
#[derive(Debug, Clone)]
pub struct TransportCoordinator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    push: Arc<dyn PushChannel>,
    backend: Arc<dyn Backend>,
    events: Sender<Event>,
    settings: TransportSettings,
    state: watch::Sender<ConnectionState>,
    timers: Mutex<TimerRegistry>,
    reconnect: Arc<Notify>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    pending: Mutex<Option<PendingRequest>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TransportCoordinator {
    pub fn new(push: Arc<dyn PushChannel>, backend: Arc<dyn Backend>, events: Sender<Event>, settings: TransportSettings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        TransportCoordinator {
            inner: Arc::new(Inner {
                push,
                backend,
                events,
                settings,
                state,
                timers: Mutex::new(TimerRegistry::new()),
                reconnect: Arc::new(Notify::new()),
                supervisor: Mutex::new(None),
                listener: Mutex::new(None),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Current state followed by every transition.
    pub fn state_changes(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Starts the reconnect supervisor and makes the first connection attempt.
    pub async fn start(&self) -> ConnectionState {
        {
            let mut supervisor = locked(&self.inner.supervisor);
            if supervisor.as_ref().is_none_or(JoinHandle::is_finished) {
                *supervisor = Some(tokio::spawn(self.clone().supervise()));
            }
        }

        self.connect().await
    }

    /// Tears everything down: supervisor, listener, every job and the push session.
    pub async fn stop(&self) {
        info!("🛑 Stopping transport...");
        if let Some(supervisor) = locked(&self.inner.supervisor).take() {
            supervisor.abort();
        }
        self.abort_listener();
        locked(&self.inner.timers).stop_all();
        self.abandon_pending();

        self.inner.state.send_replace(ConnectionState::Disconnected);
        self.inner.push.disconnect().await;
        info!("🛑 Stopping transport... OK");
    }

    /// Attempts a push session. A no-op while already connecting or connected.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> ConnectionState {
        let claimed = self.inner.state.send_if_modified(|state| {
            if state.is_busy() {
                false
            } else {
                *state = ConnectionState::Connecting;
                true
            }
        });
        if !claimed {
            debug!("Already connecting or connected");
            return self.state();
        }

        locked(&self.inner.timers).stop(Job::Reconnect);
        info!("🔌 Connecting to push channel...");

        let (tx, rx) = mpsc::channel(PUSH_BUFFER_SIZE);
        let connect_timeout = self.inner.settings.connect_timeout;
        let outcome = match timeout(connect_timeout, self.inner.push.connect(tx)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(connect_timeout)),
        };

        // Disconnected or stopped while the handshake was in flight
        if self.state() != ConnectionState::Connecting {
            if outcome.is_ok() {
                self.inner.push.disconnect().await;
            }
            return self.state();
        }

        let outcome = match outcome {
            Ok(()) => self.on_connected(rx).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            warn!("🔴 Connecting to push channel... failed: {}", e);
            self.inner.push.disconnect().await;
            self.degrade(e.to_string());
        }

        self.state()
    }

    /// Ends the push session on purpose. Polling takes over and no reconnect is scheduled.
    pub async fn disconnect(&self) {
        info!("🔌 Disconnecting push channel...");
        self.inner.state.send_replace(ConnectionState::Disconnected);
        self.abort_listener();
        self.abandon_pending();
        {
            let mut timers = locked(&self.inner.timers);
            timers.stop(Job::Reconnect);
            timers.stop(Job::RequestSensors);
            self.start_polling(&mut timers);
        }
        self.inner.push.disconnect().await;
        info!("🔌 Disconnecting push channel... OK");
    }

    /// Sends `request` over whichever channel is live.
    ///
    /// Failures are returned and never change the connection state. Only a component test is retried,
    /// exactly once, against the next endpoint.
    #[instrument(skip(self), fields(state = %self.state()))]
    pub async fn send(&self, request: Request) -> Result<Delivery, SendError> {
        if !self.state().is_connected() {
            return self.send_over_http(request).await;
        }

        match request {
            Request::TestHardware(test) => self.test_over_push(test).await,
            request => match topics::outgoing(&request) {
                Some((topic, payload)) => {
                    self.inner.push.publish(topic, payload).await?;
                    Ok(Delivery::Published)
                }
                None => self.send_over_http(request).await,
            },
        }
    }

    async fn supervise(self) {
        loop {
            self.inner.reconnect.notified().await;
            debug!("⏱️ Reconnect timer fired");
            self.connect().await;
        }
    }

    async fn on_connected(&self, rx: Receiver<PushEvent>) -> Result<(), TransportError> {
        for topic in topics::SUBSCRIPTIONS {
            self.inner.push.subscribe(topic).await?;
        }

        {
            let mut listener = locked(&self.inner.listener);
            if let Some(previous) = listener.replace(tokio::spawn(self.clone().listen(rx))) {
                previous.abort();
            }
        }

        self.inner.state.send_replace(ConnectionState::Connected);
        {
            let mut timers = locked(&self.inner.timers);
            for job in Job::POLLING {
                timers.stop(job);
            }
            timers.start(
                Job::RequestSensors,
                pollers::request_sensors(self.inner.push.clone(), self.inner.settings.sensors_interval),
            );
        }
        info!("🔌 Connecting to push channel... OK");

        self.request_alarm_list().await;
        Ok(())
    }

    fn degrade(&self, reason: String) {
        info!(%reason, "🟠 Falling back to polling");
        self.inner.state.send_replace(ConnectionState::Degraded(reason));

        let mut timers = locked(&self.inner.timers);
        timers.stop(Job::RequestSensors);
        self.start_polling(&mut timers);

        let reconnect = self.inner.reconnect.clone();
        let delay = self.inner.settings.reconnect_delay;
        timers.start(Job::Reconnect, async move {
            time::sleep(delay).await;
            reconnect.notify_one();
        });
    }

    fn start_polling(&self, timers: &mut TimerRegistry) {
        let backend = &self.inner.backend;
        let events = &self.inner.events;
        let settings = &self.inner.settings;

        timers.start(
            Job::PollAlarms,
            pollers::poll_alarms(backend.clone(), events.clone(), settings.alarms_interval, settings.change_detection),
        );
        timers.start(
            Job::PollSensors,
            pollers::poll_sensors(backend.clone(), events.clone(), settings.sensors_interval),
        );
        timers.start(
            Job::PollAlarmState,
            pollers::poll_alarm_state(backend.clone(), events.clone(), settings.alarm_state_interval),
        );
        timers.start(
            Job::PollOutput,
            pollers::poll_output(backend.clone(), events.clone(), settings.output_interval),
        );
    }

    #[instrument(skip_all)]
    async fn listen(self, mut rx: Receiver<PushEvent>) {
        loop {
            match rx.recv().await {
                Some(PushEvent::Message { topic, payload }) => self.dispatch(&topic, &payload).await,
                Some(PushEvent::ConnectionLost(reason)) => {
                    self.connection_lost(reason).await;
                    break;
                }
                None => {
                    self.connection_lost("push channel closed".to_string()).await;
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, topic: &str, payload: &str) {
        let message = match IncomingMessage::parse(topic, payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("⚠️ Dropping push message: {}", e);
                return;
            }
        };
        trace!(topic, "📨 Received {:?}", message);

        if message.confirms_list_change() {
            self.request_alarm_list().await;
        }

        let event = match message {
            IncomingMessage::AlarmList(alarms) => Event::AlarmListReceived(alarms),
            IncomingMessage::AlarmAdded(text) | IncomingMessage::AlarmDeleted(text) | IncomingMessage::AlarmToggled(text) => {
                Event::BackendMessage(text)
            }
            IncomingMessage::AlarmState(state) => Event::AlarmStateReceived(state),
            IncomingMessage::Output(line) => Event::OutputReceived(vec![line]),
            IncomingMessage::Error(text) => Event::BackendError(text),
            IncomingMessage::SensorData(snapshot) => Event::SensorSnapshotReceived(snapshot),
            IncomingMessage::HardwareResponse(response) => {
                let pending = locked(&self.inner.pending).take();
                match pending {
                    Some(pending) if !pending.is_abandoned() => {
                        pending.resolve(response);
                        return;
                    }
                    _ => Event::HardwareResponseReceived(response),
                }
            }
            IncomingMessage::Unknown { topic } => {
                debug!(topic, "Ignoring message on unknown topic");
                return;
            }
        };

        self.emit(event).await;
    }

    async fn connection_lost(&self, reason: String) {
        if !self.state().is_connected() {
            debug!(%reason, "Ignoring loss of a session that is no longer current");
            return;
        }

        warn!("🔴 Push channel connection lost: {}", reason);
        self.abandon_pending();
        self.degrade(reason);
        self.inner.push.disconnect().await;
    }

    async fn request_alarm_list(&self) {
        if let Err(e) = self.inner.push.publish(topics::REQUEST_LIST, "{}".to_string()).await {
            warn!("⚠️ Could not request the alarm list: {}", e);
        }
    }

    #[instrument(skip_all, fields(component = %test.component, action = %test.action))]
    async fn test_over_push(&self, test: ComponentTest) -> Result<Delivery, SendError> {
        let wait = self.inner.settings.hardware_response_timeout;
        let (pending, reply) = PendingRequest::new(test.clone());
        // Responses are not correlated, a newer test supersedes an older one
        let superseded = locked(&self.inner.pending).replace(pending);
        drop(superseded);

        let failure = match topics::outgoing(&Request::TestHardware(test.clone())) {
            Some((topic, payload)) => match self.inner.push.publish(topic, payload).await {
                Ok(()) => match timeout(wait, reply).await {
                    Ok(Ok(response)) => return Ok(Delivery::Hardware(response)),
                    Ok(Err(_)) => TransportError::Abandoned,
                    Err(_) => TransportError::NoResponse(wait),
                },
                Err(e) => e,
            },
            None => TransportError::NotConnected,
        };

        let endpoint = self.inner.settings.primary_endpoint;
        warn!("⚠️ Hardware test over push failed: {}. Retrying on {}", failure, endpoint);
        match self.inner.backend.test_hardware(endpoint, &test).await {
            Ok(response) => Ok(Delivery::Hardware(response)),
            Err(e) => {
                warn!("🔴 Hardware test on {} failed: {}", endpoint, e);
                Err(SendError::AllAttemptsFailed { last_error: e.to_string() })
            }
        }
    }

    #[instrument(skip_all, fields(component = %test.component, action = %test.action))]
    async fn test_over_http(&self, test: &ComponentTest) -> Result<Delivery, SendError> {
        let primary = self.inner.settings.primary_endpoint;
        let fallback = self.inner.settings.fallback_endpoint;

        match self.inner.backend.test_hardware(primary, test).await {
            Ok(response) => return Ok(Delivery::Hardware(response)),
            Err(e) if e.is_transport() => warn!("⚠️ Hardware test on {} failed: {}. Retrying on {}", primary, e, fallback),
            Err(e) => return Err(e.into()),
        }

        match self.inner.backend.test_hardware(fallback, test).await {
            Ok(response) => Ok(Delivery::Hardware(response)),
            Err(e) => {
                warn!("🔴 Hardware test on {} failed: {}", fallback, e);
                Err(SendError::AllAttemptsFailed { last_error: e.to_string() })
            }
        }
    }

    async fn send_over_http(&self, request: Request) -> Result<Delivery, SendError> {
        let backend = &self.inner.backend;

        let delivery = match request {
            Request::ListAlarms => {
                let alarms = backend.alarms().await?;
                self.emit(Event::AlarmListReceived(alarms)).await;
                Delivery::Completed(None)
            }
            Request::AddAlarm(time) => Delivery::Completed(backend.add_alarm(time).await?.into_result()?),
            Request::DeleteAlarm { index } => Delivery::Completed(backend.delete_alarm(index).await?.into_result()?),
            Request::ToggleAlarm { index } => Delivery::Completed(backend.toggle_alarm(index).await?.into_result()?),
            Request::Snooze => Delivery::Completed(backend.snooze().await?.into_result()?),
            Request::SensorData => {
                let snapshot = backend.sensor_data().await?;
                self.emit(Event::SensorSnapshotReceived(snapshot)).await;
                Delivery::Completed(None)
            }
            Request::TestHardware(test) => self.test_over_http(&test).await?,
            Request::StartScript => Delivery::Completed(backend.start_script().await?.into_result()?),
            Request::StopScript => Delivery::Completed(backend.stop_script().await?.into_result()?),
            Request::ScriptStatus => Delivery::ScriptStatus(backend.script_status().await?),
            Request::HardwareStatus => Delivery::HardwareStatus(backend.hardware_status().await?),
        };

        Ok(delivery)
    }

    async fn emit(&self, event: Event) {
        if self.inner.events.send(event).await.is_err() {
            debug!("Event receiver is gone, dropping event");
        }
    }

    fn abort_listener(&self) {
        if let Some(listener) = locked(&self.inner.listener).take() {
            listener.abort();
        }
    }

    fn abandon_pending(&self) {
        let abandoned = locked(&self.inner.pending).take();
        if let Some(pending) = abandoned {
            debug!(component = %pending.test().component, "Abandoning pending hardware test");
        }
    }

    #[cfg(test)]
    pub fn is_job_running(&self, job: Job) -> bool {
        locked(&self.inner.timers).is_running(job)
    }
}
