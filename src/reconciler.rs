use crate::domain::{AlarmActiveState, AlarmEntry, SensorSnapshot};

/// Everything the client knows about the backend. Each part is replaced wholesale, the last
/// update processed wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub alarms: Vec<AlarmEntry>,
    pub sensors: Option<SensorSnapshot>,
    pub alarm_state: AlarmActiveState,
    pub notification_shown: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDirective {
    Show(String),
    Hide,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmActiveOutcome {
    pub changed: bool,
    pub directive: NotificationDirective,
}

/// Applies updates to the [`Model`].
///
/// At most one notification is visible. It is shown when an active state arrives while hidden and
/// hidden when an inactive state arrives while shown. Repeats of either are no-ops.
#[derive(Debug, Default)]
pub struct StateReconciler {
    model: Model,
}

impl StateReconciler {
    pub fn new() -> Self {
        StateReconciler::default()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Returns whether the list differs from the previous one.
    pub fn apply_alarm_list(&mut self, alarms: Vec<AlarmEntry>) -> bool {
        let changed = self.model.alarms != alarms;
        self.model.alarms = alarms;
        changed
    }

    pub fn apply_sensor_snapshot(&mut self, snapshot: SensorSnapshot) -> bool {
        let changed = self.model.sensors.as_ref() != Some(&snapshot);
        self.model.sensors = Some(snapshot);
        changed
    }

    pub fn apply_alarm_active(&mut self, state: AlarmActiveState) -> AlarmActiveOutcome {
        let changed = self.model.alarm_state != state;

        let directive = match (state.active, self.model.notification_shown) {
            (true, false) => {
                self.model.notification_shown = true;
                NotificationDirective::Show(state.message_or_default().to_string())
            }
            (false, true) => {
                self.model.notification_shown = false;
                NotificationDirective::Hide
            }
            _ => NotificationDirective::Unchanged,
        };

        self.model.alarm_state = state;
        AlarmActiveOutcome { changed, directive }
    }
}
