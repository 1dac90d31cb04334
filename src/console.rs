use crate::domain::events::Notice;
use crate::domain::{AlarmEntry, ConnectionState, SensorSnapshot, TestState};
use crate::reconciler::Model;
use futures::StreamExt;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, instrument, warn};

const UNKNOWN: &str = "--";

/// Logs model changes, notices, connection state and component test transitions until the model is gone.
#[instrument(skip_all)]
pub async fn render(
    mut model_rx: watch::Receiver<Model>,
    mut notices: Receiver<Notice>,
    mut states: WatchStream<ConnectionState>,
    mut tests: WatchStream<TestState>,
) {
    let mut shown = Model::default();

    loop {
        tokio::select! {
            changed = model_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let model = model_rx.borrow_and_update().clone();
                render_changes(&shown, &model);
                shown = model;
            }
            Some(notice) = notices.recv() => render_notice(notice),
            Some(state) = states.next() => info!("📡 Connection: {}", state),
            Some(test) = tests.next() => render_test_state(&test),
        }
    }
}

fn render_changes(previous: &Model, current: &Model) {
    if previous.alarms != current.alarms {
        info!("⏰ Alarms:");
        for line in alarm_table(&current.alarms) {
            info!("   {}", line);
        }
    }

    if previous.sensors != current.sensors {
        if let Some(sensors) = &current.sensors {
            info!("📟 {}", sensor_line(sensors));
        }
    }
}

fn render_notice(notice: Notice) {
    match notice {
        Notice::Output(line) => info!("📜 {}", line),
        Notice::Info(message) => info!("ℹ️ {}", message),
        Notice::Error(message) => warn!("⚠️ {}", message),
        Notice::ShowNotification(message) => info!("🔔 ALARM: {}", message),
        Notice::HideNotification => info!("🔕 Alarm notification dismissed"),
        Notice::HardwareResponse(response) if response.is_success() => info!("🔧 {}", response.describe("Hardware")),
        Notice::HardwareResponse(response) => {
            warn!("🔧 Hardware test failed: {}", response.message.as_deref().unwrap_or("no details"))
        }
    }
}

fn render_test_state(test: &TestState) {
    match test {
        TestState::Idle => {}
        TestState::Testing { component } => info!("🔧 Testing {}...", component),
        TestState::Success { component, message } => info!("🔧 Testing {}... OK: {}", component, message),
        TestState::Failed { component, message } => warn!("🔴 Testing {}... failed: {}", component, message),
    }
}

pub fn alarm_table(alarms: &[AlarmEntry]) -> Vec<String> {
    if alarms.is_empty() {
        return vec!["No alarms set".to_string()];
    }

    alarms
        .iter()
        .enumerate()
        .map(|(index, alarm)| {
            let status = if alarm.active { "Active" } else { "Inactive" };
            format!("{index:>2}. {} {status}", alarm.time)
        })
        .collect()
}

/// One line of readings. The distance only matters while an alarm rings, so it is left out otherwise.
pub fn sensor_line(sensors: &SensorSnapshot) -> String {
    let temp_humidity_simulated = sensors.temp_humidity_simulated();
    let mut parts = vec![
        format!("Temperature {}", reading(sensors.temperature, "°C", temp_humidity_simulated)),
        format!("Humidity {}", reading(sensors.humidity, "%", temp_humidity_simulated)),
    ];

    if sensors.alarm_active {
        parts.push(format!("Distance {}", distance(sensors)));
    }

    let movement = if sensors.movement_detected { "Movement detected" } else { "No movement" };
    parts.push(simulated(movement.to_string(), sensors.movement_simulated()));

    if let Some(observed_at) = sensors.observed_at() {
        parts.push(format!("at {}", observed_at.format("%H:%M:%S")));
    }

    parts.join(" | ")
}

fn reading(value: Option<f64>, unit: &str, is_simulated: bool) -> String {
    match value {
        Some(value) => simulated(format!("{value:.1}{unit}"), is_simulated),
        None => UNKNOWN.to_string(),
    }
}

fn simulated(text: String, is_simulated: bool) -> String {
    if is_simulated { format!("{text} (sim)") } else { text }
}

fn distance(sensors: &SensorSnapshot) -> String {
    let value = reading(sensors.distance, "cm", sensors.distance_simulated());
    match sensors.distance_status() {
        Some(status) => format!("{value} ({})", status.describe()),
        None => value,
    }
}
