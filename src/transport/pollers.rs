use crate::backend::{AlarmsFingerprint, Backend};
use crate::domain::events::Event;
use crate::push::{PushChannel, topics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, instrument, trace, warn};

// First tick fires immediately
fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[instrument(skip_all, fields(job = "poll_alarms"))]
pub async fn poll_alarms(backend: Arc<dyn Backend>, events: Sender<Event>, period: Duration, change_detection: bool) {
    let mut interval = ticker(period);
    let mut fingerprint: Option<AlarmsFingerprint> = None;

    loop {
        interval.tick().await;

        let latest = if change_detection {
            match backend.alarms_fingerprint().await {
                Ok(latest) if fingerprint.as_ref() == Some(&latest) => {
                    trace!("Alarms unchanged, skipping refresh");
                    continue;
                }
                Ok(latest) => Some(latest),
                Err(e) => {
                    debug!("Could not check for alarm changes, refreshing anyway: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let event = match backend.alarms().await {
            Ok(alarms) => {
                if latest.is_some() {
                    fingerprint = latest;
                }
                Event::AlarmListReceived(alarms)
            }
            Err(e) => {
                warn!("⚠️ Error loading alarms: {}", e);
                Event::BackendError(format!("Error loading alarms: {e}"))
            }
        };

        if events.send(event).await.is_err() {
            break;
        }
    }
}

#[instrument(skip_all, fields(job = "poll_sensors"))]
pub async fn poll_sensors(backend: Arc<dyn Backend>, events: Sender<Event>, period: Duration) {
    let mut interval = ticker(period);

    loop {
        interval.tick().await;

        match backend.sensor_data().await {
            Ok(snapshot) => {
                if events.send(Event::SensorSnapshotReceived(snapshot)).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("⚠️ Error fetching sensor data: {}", e),
        }
    }
}

#[instrument(skip_all, fields(job = "poll_alarm_state"))]
pub async fn poll_alarm_state(backend: Arc<dyn Backend>, events: Sender<Event>, period: Duration) {
    let mut interval = ticker(period);

    loop {
        interval.tick().await;

        match backend.alarm_state().await {
            Ok(state) => {
                if events.send(Event::AlarmStateReceived(state)).await.is_err() {
                    break;
                }
            }
            Err(e) => debug!("Error checking alarm state: {}", e),
        }
    }
}

#[instrument(skip_all, fields(job = "poll_output"))]
pub async fn poll_output(backend: Arc<dyn Backend>, events: Sender<Event>, period: Duration) {
    let mut interval = ticker(period);

    loop {
        interval.tick().await;

        match backend.output().await {
            Ok(response) if response.output.is_empty() => {}
            Ok(response) => {
                if events.send(Event::OutputReceived(response.output)).await.is_err() {
                    break;
                }
            }
            Err(e) => debug!("Error polling output: {}", e),
        }
    }
}

/// Asks the broker for fresh sensor readings while the push channel is connected.
#[instrument(skip_all, fields(job = "request_sensors"))]
pub async fn request_sensors(push: Arc<dyn PushChannel>, period: Duration) {
    let mut interval = ticker(period);

    loop {
        interval.tick().await;

        if let Err(e) = push.publish(topics::REQUEST_SENSOR, "{}".to_string()).await {
            debug!("Could not request sensor data: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlarmActiveState, AlarmEntry, AlarmTime, SensorSnapshot};
    use crate::testing::FakeBackend;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn polls_alarms_immediately_and_then_every_period() {
        let backend = Arc::new(FakeBackend::with_alarms(vec![AlarmEntry::new(AlarmTime::new(6, 0, 0).unwrap(), true)]));
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_alarms(backend.clone(), tx, Duration::from_secs(5), false));
        time::sleep(Duration::from_millis(10_010)).await;
        task.abort();

        assert_eq!(backend.calls_to("GET /alarms"), 3);
        assert!(matches!(rx.recv().await, Some(Event::AlarmListReceived(alarms)) if alarms.len() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn change_detection_skips_unchanged_alarm_lists() {
        let backend = Arc::new(FakeBackend::default());
        let (tx, _rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_alarms(backend.clone(), tx, Duration::from_secs(5), true));
        time::sleep(Duration::from_millis(10_010)).await;
        task.abort();

        assert_eq!(backend.calls_to("GET /check_alarms_updated"), 3);
        assert_eq!(backend.calls_to("GET /alarms"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_change_check_still_refreshes_the_list() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_next("/check_alarms_updated", 1);
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_alarms(backend.clone(), tx, Duration::from_secs(5), true));
        time::sleep(Duration::from_millis(10_010)).await;
        task.abort();

        assert_eq!(backend.calls_to("GET /check_alarms_updated"), 3);
        // Nothing was committed by the failed check, so the first good one refreshes again
        assert_eq!(backend.calls_to("GET /alarms"), 2);
        assert_eq!(rx.recv().await, Some(Event::AlarmListReceived(vec![])));
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_refresh_does_not_commit_the_fingerprint() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_next("/alarms", 1);
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_alarms(backend.clone(), tx, Duration::from_secs(5), true));
        time::sleep(Duration::from_millis(10_010)).await;
        task.abort();

        assert_eq!(backend.calls_to("GET /check_alarms_updated"), 3);
        assert_eq!(backend.calls_to("GET /alarms"), 2);
        assert!(matches!(rx.recv().await, Some(Event::BackendError(message)) if message.starts_with("Error loading alarms")));
        assert_eq!(rx.recv().await, Some(Event::AlarmListReceived(vec![])));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_sensor_snapshots() {
        let backend = Arc::new(FakeBackend::default());
        let snapshot = SensorSnapshot {
            temperature: Some(21.5),
            ..SensorSnapshot::default()
        };
        backend.set_sensors(snapshot.clone());
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_sensors(backend.clone(), tx, Duration::from_secs(2)));
        time::sleep(Duration::from_millis(2_010)).await;
        task.abort();

        assert_eq!(backend.calls_to("GET /sensor_data"), 2);
        assert_eq!(rx.recv().await, Some(Event::SensorSnapshotReceived(snapshot)));
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_the_alarm_state() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_alarm_state(AlarmActiveState::active("Wake up"));
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_alarm_state(backend.clone(), tx, Duration::from_secs(1)));
        time::sleep(Duration::from_millis(10)).await;
        task.abort();

        assert_eq!(rx.recv().await, Some(Event::AlarmStateReceived(AlarmActiveState::active("Wake up"))));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_output_is_not_forwarded() {
        let backend = Arc::new(FakeBackend::default());
        backend.queue_output(vec!["Alarm triggered".to_string()]);
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(poll_output(backend.clone(), tx, Duration::from_millis(500)));
        time::sleep(Duration::from_millis(1_510)).await;
        task.abort();

        assert_eq!(backend.calls_to("GET /output"), 4);
        assert_eq!(rx.recv().await, Some(Event::OutputReceived(vec!["Alarm triggered".to_string()])));
        assert!(rx.try_recv().is_err());
    }
}
