use crate::app_config::AppConfig;
use crate::backend::{Backend, HttpBackend, wait_for_backend};
use crate::dispatcher::ActionDispatcher;
use crate::domain::events::{Event, Notice};
use crate::push::{MqttPushChannel, MqttSettings, PushChannel};
use crate::store::Store;
use crate::transport::{TransportCoordinator, TransportSettings};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::{signal, task};
use tracing::{info, warn};

mod app_config;
mod backend;
mod cli;
mod console;
mod dispatcher;
mod domain;
mod push;
mod reconciler;
mod store;
#[cfg(test)]
mod testing;
mod transport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let client = backend::new_client(&config)?;
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(client, config.backend().url()));
    match wait_for_backend(backend.as_ref(), config.backend().probe_attempts(), config.backend().probe_interval()).await {
        Ok(_) => info!("✅  Backend is reachable"),
        Err(e) => warn!("⚠️ Backend did not answer, continuing anyway: {}", e),
    }

    let (events_tx, events_rx) = mpsc::channel::<Event>(config.core().event_buffer_size());
    let (notices_tx, notices_rx) = mpsc::channel::<Notice>(config.core().event_buffer_size());
    let mut store = Store::new(events_rx, notices_tx);
    let model_rx = store.notifier();

    task::spawn(async move {
        store.listen().await;
    });
    info!("✅  Initialized store");

    let push: Arc<dyn PushChannel> = Arc::new(MqttPushChannel::new(MqttSettings::from(config.push())));
    let coordinator = TransportCoordinator::new(push, backend, events_tx.clone(), TransportSettings::from(&config));

    let dispatcher = ActionDispatcher::new(coordinator.clone(), events_tx);

    task::spawn(console::render(model_rx, notices_rx, coordinator.state_changes(), dispatcher.test_states()));
    info!("✅  Initialized console");

    match dispatcher.hardware_status().await {
        Ok(status) => info!(
            "✅  Hardware available: {}, components: {}",
            status.hardware_available,
            status.components.join(", ")
        ),
        Err(e) => warn!("⚠️ Could not fetch hardware status: {}", e),
    }

    let state = coordinator.start().await;
    info!("🔥 {} is up and running ({})", env!("CARGO_PKG_NAME"), state);

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = cli::run(&dispatcher, stdin) => result?,
        _ = signal::ctrl_c() => info!("🛑 Received Ctrl-C"),
    }

    coordinator.stop().await;
    Ok(())
}
