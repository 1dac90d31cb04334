use crate::backend::{Backend, BackendError, ScriptStatus};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{info, instrument, warn};

/// Waits until the backend answers `GET /status`, retrying on a fixed interval.
#[instrument(skip(backend))]
pub async fn wait_for_backend(backend: &dyn Backend, attempts: usize, interval: Duration) -> Result<ScriptStatus, BackendError> {
    info!("Probing backend...");
    let strategy = FixedInterval::new(interval).take(attempts.saturating_sub(1));

    let status = Retry::spawn(strategy, move || async move {
        backend.script_status().await.inspect_err(|e| warn!("⚠️ Backend not reachable: {}. Retrying...", e))
    })
    .await?;

    info!(script_running = status.script_running, "Probing backend... OK");
    Ok(status)
}
