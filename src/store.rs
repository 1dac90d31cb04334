use crate::domain::events::{Event, Notice};
use crate::reconciler::{Model, NotificationDirective, StateReconciler};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch::{self, Receiver as WatchReceiver, Sender as WatchSender};
use tracing::{debug, info, instrument, trace};

/// The single writer of the model. Every update, from either channel, is applied here in arrival order.
#[derive(Debug)]
pub struct Store {
    reconciler: StateReconciler,
    rx: Receiver<Event>,
    notifier_tx: WatchSender<Model>,
    notices_tx: Sender<Notice>,
}

impl Store {
    pub fn new(rx: Receiver<Event>, notices_tx: Sender<Notice>) -> Self {
        let (notifier_tx, _) = watch::channel(Model::default());

        Store {
            reconciler: StateReconciler::new(),
            rx,
            notifier_tx,
            notices_tx,
        }
    }

    pub fn notifier(&self) -> WatchReceiver<Model> {
        self.notifier_tx.subscribe()
    }

    #[instrument(skip(self))]
    pub async fn listen(&mut self) {
        while let Some(event) = self.rx.recv().await {
            trace!("🔵 Received event: {:?}", event);
            self.apply(event).await;
        }
        debug!("Event channel closed, store stopped");
    }

    async fn apply(&mut self, event: Event) {
        match event {
            Event::AlarmListReceived(alarms) => {
                let num_alarms = alarms.len();
                if self.reconciler.apply_alarm_list(alarms) {
                    info!("🔵 Updated alarm list, {} alarm(s)", num_alarms);
                    self.publish();
                }
            }
            Event::SensorSnapshotReceived(snapshot) => {
                if self.reconciler.apply_sensor_snapshot(snapshot) {
                    debug!("🔵 Updated sensor readings");
                    self.publish();
                }
            }
            Event::AlarmStateReceived(state) => {
                let outcome = self.reconciler.apply_alarm_active(state);
                match outcome.directive {
                    NotificationDirective::Show(message) => self.notify(Notice::ShowNotification(message)).await,
                    NotificationDirective::Hide => self.notify(Notice::HideNotification).await,
                    NotificationDirective::Unchanged if outcome.changed => {}
                    NotificationDirective::Unchanged => return,
                }
                self.publish();
            }
            Event::OutputReceived(lines) => {
                for line in lines {
                    self.notify(Notice::Output(line)).await;
                }
            }
            Event::BackendMessage(message) => self.notify(Notice::Info(message)).await,
            Event::BackendError(message) => self.notify(Notice::Error(message)).await,
            Event::HardwareResponseReceived(response) => self.notify(Notice::HardwareResponse(response)).await,
        }
    }

    fn publish(&self) {
        self.notifier_tx.send_replace(self.reconciler.model().clone());
    }

    async fn notify(&self, notice: Notice) {
        if self.notices_tx.send(notice).await.is_err() {
            debug!("Notice receiver is gone, dropping notice");
        }
    }
}
