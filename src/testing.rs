//! In-memory stand-ins for the broker and the backend.

use crate::backend::responses::{OutputResponse, StatusResponse};
use crate::backend::{AlarmsFingerprint, Backend, BackendError, ScriptStatus};
use crate::domain::{
    AlarmActiveState, AlarmEntry, AlarmTime, ComponentTest, HardwareResponse, HardwareStatus, HardwareTestEndpoint, SensorSnapshot,
};
use crate::push::{PushChannel, PushEvent, TransportError, topics};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse,
    Hang,
}

#[derive(Debug)]
pub struct FakePushChannel {
    created_at: Instant,
    state: Mutex<PushState>,
}

#[derive(Debug)]
struct PushState {
    default_outcome: ConnectOutcome,
    queued: VecDeque<ConnectOutcome>,
    attempts: Vec<Instant>,
    subscriptions: Vec<String>,
    published: Vec<(String, String)>,
    events: Option<Sender<PushEvent>>,
    hardware_reply: Option<String>,
}

impl FakePushChannel {
    pub fn new(default_outcome: ConnectOutcome) -> Self {
        FakePushChannel {
            created_at: Instant::now(),
            state: Mutex::new(PushState {
                default_outcome,
                queued: VecDeque::new(),
                attempts: vec![],
                subscriptions: vec![],
                published: vec![],
                events: None,
                hardware_reply: None,
            }),
        }
    }

    /// Outcome for the next connect attempt, ahead of the default.
    pub fn queue(&self, outcome: ConnectOutcome) {
        locked(&self.state).queued.push_back(outcome);
    }

    /// Answers every published hardware test with `payload` on the response topic.
    pub fn reply_to_hardware(&self, payload: &str) {
        locked(&self.state).hardware_reply = Some(payload.to_string());
    }

    /// Time of each connect attempt, relative to the creation of the fake.
    pub fn connect_offsets(&self) -> Vec<Duration> {
        locked(&self.state).attempts.iter().map(|at| at.duration_since(self.created_at)).collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        locked(&self.state).subscriptions.clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<String> {
        locked(&self.state)
            .published
            .iter()
            .filter(|(published_topic, _)| published_topic == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn inject(&self, topic: &str, payload: &str) {
        self.deliver(PushEvent::Message {
            topic: topic.to_string(),
            payload: payload.to_string(),
        })
        .await;
    }

    pub async fn drop_connection(&self, reason: &str) {
        self.deliver(PushEvent::ConnectionLost(reason.to_string())).await;
        locked(&self.state).events = None;
    }

    async fn deliver(&self, event: PushEvent) {
        let events = locked(&self.state).events.clone();
        if let Some(events) = events {
            events.send(event).await.unwrap();
        }
    }
}

#[async_trait]
impl PushChannel for FakePushChannel {
    async fn connect(&self, events: Sender<PushEvent>) -> Result<(), TransportError> {
        let outcome = {
            let mut state = locked(&self.state);
            state.attempts.push(Instant::now());
            state.queued.pop_front().unwrap_or(state.default_outcome)
        };

        match outcome {
            ConnectOutcome::Accept => {
                locked(&self.state).events = Some(events);
                Ok(())
            }
            ConnectOutcome::Refuse => Err(TransportError::Handshake("connection refused".to_string())),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let mut state = locked(&self.state);
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        let reply = {
            let mut state = locked(&self.state);
            let Some(events) = state.events.clone() else {
                return Err(TransportError::NotConnected);
            };
            state.published.push((topic.to_string(), payload));

            match (&state.hardware_reply, topic) {
                (Some(reply), topics::REQUEST_HARDWARE) => Some((events, reply.clone())),
                _ => None,
            }
        };

        if let Some((events, payload)) = reply {
            let _ = events
                .send(PushEvent::Message {
                    topic: topics::HARDWARE_RESPONSE.to_string(),
                    payload,
                })
                .await;
        }
        Ok(())
    }

    async fn disconnect(&self) {
        locked(&self.state).events = None;
    }
}

/// A backend keeping its alarms in memory and recording every call as `"METHOD /path"`.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

#[derive(Debug, Default)]
struct BackendState {
    alarms: Vec<AlarmEntry>,
    alarm_state: AlarmActiveState,
    sensors: SensorSnapshot,
    output: VecDeque<Vec<String>>,
    calls: Vec<String>,
    failures: HashMap<String, usize>,
    failing_endpoints: HashSet<HardwareTestEndpoint>,
}

impl FakeBackend {
    pub fn with_alarms(alarms: Vec<AlarmEntry>) -> Self {
        let backend = FakeBackend::default();
        locked(&backend.state).alarms = alarms;
        backend
    }

    pub fn alarms_now(&self) -> Vec<AlarmEntry> {
        locked(&self.state).alarms.clone()
    }

    pub fn set_alarm_state(&self, alarm_state: AlarmActiveState) {
        locked(&self.state).alarm_state = alarm_state;
    }

    pub fn set_sensors(&self, sensors: SensorSnapshot) {
        locked(&self.state).sensors = sensors;
    }

    pub fn queue_output(&self, lines: Vec<String>) {
        locked(&self.state).output.push_back(lines);
    }

    /// The next `times` calls to `path` answer with HTTP 503.
    pub fn fail_next(&self, path: &str, times: usize) {
        locked(&self.state).failures.insert(path.to_string(), times);
    }

    /// Every test on `endpoint` answers with HTTP 404.
    pub fn fail_endpoint(&self, endpoint: HardwareTestEndpoint) {
        locked(&self.state).failing_endpoints.insert(endpoint);
    }

    pub fn calls_to(&self, call: &str) -> usize {
        locked(&self.state).calls.iter().filter(|recorded| *recorded == call).count()
    }

    fn record(&self, method: &str, path: &str) -> Result<MutexGuard<'_, BackendState>, BackendError> {
        let mut state = locked(&self.state);
        state.calls.push(format!("{method} {path}"));

        if let Some(remaining) = state.failures.get_mut(path).filter(|remaining| **remaining > 0) {
            *remaining -= 1;
            return Err(BackendError::Status {
                path: path.to_string(),
                status: 503,
            });
        }
        Ok(state)
    }
}

fn success(message: impl Into<String>) -> StatusResponse {
    StatusResponse {
        status: "success".to_string(),
        message: Some(message.into()),
    }
}

fn error(message: impl Into<String>) -> StatusResponse {
    StatusResponse {
        status: "error".to_string(),
        message: Some(message.into()),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn alarms(&self) -> Result<Vec<AlarmEntry>, BackendError> {
        Ok(self.record("GET", "/alarms")?.alarms.clone())
    }

    async fn alarms_fingerprint(&self) -> Result<AlarmsFingerprint, BackendError> {
        let state = self.record("GET", "/check_alarms_updated")?;
        let content_hash = state
            .alarms
            .iter()
            .fold(state.alarms.len() as i64, |hash, alarm| hash * 31 + i64::from(alarm.active));

        Ok(AlarmsFingerprint {
            timestamp: 1_718_000_000.0,
            content_hash,
        })
    }

    async fn add_alarm(&self, time: AlarmTime) -> Result<StatusResponse, BackendError> {
        let mut state = self.record("POST", "/alarm")?;
        state.alarms.push(AlarmEntry::new(time, true));
        Ok(success(format!("Alarm set for {time}")))
    }

    async fn delete_alarm(&self, index: usize) -> Result<StatusResponse, BackendError> {
        let mut state = self.record("DELETE", &format!("/alarm/{index}"))?;
        if index >= state.alarms.len() {
            return Ok(error("Invalid alarm index"));
        }
        state.alarms.remove(index);
        Ok(success("Alarm deleted"))
    }

    async fn toggle_alarm(&self, index: usize) -> Result<StatusResponse, BackendError> {
        let mut state = self.record("POST", &format!("/alarm/{index}/toggle"))?;
        let Some(alarm) = state.alarms.get_mut(index) else {
            return Ok(error("Invalid alarm index"));
        };
        alarm.active = !alarm.active;
        Ok(success("Alarm toggled"))
    }

    async fn alarm_state(&self) -> Result<AlarmActiveState, BackendError> {
        Ok(self.record("GET", "/alarm_state")?.alarm_state.clone())
    }

    async fn snooze(&self) -> Result<StatusResponse, BackendError> {
        let mut state = self.record("POST", "/snooze")?;
        state.alarm_state = AlarmActiveState::inactive();
        Ok(success("Alarm snoozed"))
    }

    async fn sensor_data(&self) -> Result<SensorSnapshot, BackendError> {
        Ok(self.record("GET", "/sensor_data")?.sensors.clone())
    }

    async fn hardware_status(&self) -> Result<HardwareStatus, BackendError> {
        self.record("GET", "/hardware_status")?;
        Ok(HardwareStatus {
            hardware_available: false,
            components: vec!["led".to_string(), "servo".to_string(), "buzzer".to_string()],
        })
    }

    async fn test_hardware(&self, endpoint: HardwareTestEndpoint, test: &ComponentTest) -> Result<HardwareResponse, BackendError> {
        let state = self.record("POST", endpoint.path())?;
        if state.failing_endpoints.contains(&endpoint) {
            return Err(BackendError::Status {
                path: endpoint.path().to_string(),
                status: 404,
            });
        }

        Ok(HardwareResponse {
            status: "success".to_string(),
            message: Some(format!("{} {} via {}", test.component, test.action, endpoint)),
            simulated: true,
        })
    }

    async fn output(&self) -> Result<OutputResponse, BackendError> {
        let mut state = self.record("GET", "/output")?;
        Ok(OutputResponse {
            output: state.output.pop_front().unwrap_or_default(),
            status: "success".to_string(),
        })
    }

    async fn start_script(&self) -> Result<StatusResponse, BackendError> {
        self.record("POST", "/start")?;
        Ok(success("Alarm script started"))
    }

    async fn stop_script(&self) -> Result<StatusResponse, BackendError> {
        self.record("POST", "/stop")?;
        Ok(error("Script is not running"))
    }

    async fn script_status(&self) -> Result<ScriptStatus, BackendError> {
        self.record("GET", "/status")?;
        Ok(ScriptStatus {
            script_running: false,
            interface_running: true,
            server_time: None,
        })
    }
}
