use std::collections::HashMap;
use std::fmt;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Every recurring or delayed piece of work the coordinator owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    PollAlarms,
    PollSensors,
    PollAlarmState,
    PollOutput,
    RequestSensors,
    Reconnect,
}

impl Job {
    /// HTTP polling jobs, only alive while the push channel is not connected.
    pub const POLLING: [Job; 4] = [Job::PollAlarms, Job::PollSensors, Job::PollAlarmState, Job::PollOutput];

    pub fn name(&self) -> &'static str {
        match self {
            Job::PollAlarms => "poll_alarms",
            Job::PollSensors => "poll_sensors",
            Job::PollAlarmState => "poll_alarm_state",
            Job::PollOutput => "poll_output",
            Job::RequestSensors => "request_sensors",
            Job::Reconnect => "reconnect",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// At most one task per job. Starting a job that is still alive is a no-op.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    jobs: HashMap<Job, JoinHandle<()>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        TimerRegistry::default()
    }

    /// Spawns `task` for `job` unless the job is already running. Returns whether it was spawned.
    pub fn start<F>(&mut self, job: Job, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_running(job) {
            trace!(job = %job, "Job already running");
            return false;
        }

        debug!(job = %job, "⏱️ Starting job");
        self.jobs.insert(job, tokio::spawn(task));
        true
    }

    /// Cancels `job`. Returns whether it was still running.
    pub fn stop(&mut self, job: Job) -> bool {
        let Some(handle) = self.jobs.remove(&job) else {
            return false;
        };

        let was_running = !handle.is_finished();
        handle.abort();
        if was_running {
            debug!(job = %job, "⏱️ Stopped job");
        }
        was_running
    }

    pub fn stop_all(&mut self) {
        for (_, handle) in self.jobs.drain() {
            handle.abort();
        }
    }

    pub fn is_running(&self, job: Job) -> bool {
        self.jobs.get(&job).is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}
