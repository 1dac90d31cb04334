use crate::app_config::{Push, PushTransport};
use crate::push::{PushChannel, PushEvent, TransportError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub transport: PushTransport,
    pub client_id_prefix: String,
}

impl From<&Push> for MqttSettings {
    fn from(push: &Push) -> Self {
        MqttSettings {
            host: push.host().to_string(),
            port: push.port(),
            path: push.path().to_string(),
            transport: push.transport(),
            client_id_prefix: push.client_id_prefix().to_string(),
        }
    }
}

impl MqttSettings {
    fn broker_address(&self) -> String {
        match self.transport {
            PushTransport::Tcp => self.host.clone(),
            PushTransport::Websocket => format!("ws://{}:{}{}", self.host, self.port, self.path),
        }
    }

    fn client_id(&self) -> String {
        format!("{}_{:08x}", self.client_id_prefix, rand::random::<u32>())
    }
}

/// Push channel backed by an MQTT broker, by default over websockets.
#[derive(Debug)]
pub struct MqttPushChannel {
    settings: MqttSettings,
    client: Mutex<Option<AsyncClient>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttPushChannel {
    pub fn new(settings: MqttSettings) -> Self {
        MqttPushChannel {
            settings,
            client: Mutex::new(None),
            event_loop: Mutex::new(None),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.settings.client_id(), self.settings.broker_address(), self.settings.port);
        options.set_keep_alive(KEEP_ALIVE);
        if self.settings.transport == PushTransport::Websocket {
            options.set_transport(Transport::Ws);
        }
        options
    }

    async fn client(&self) -> Result<AsyncClient, TransportError> {
        self.client.lock().await.clone().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl PushChannel for MqttPushChannel {
    #[instrument(skip_all, fields(broker = %self.settings.broker_address()))]
    async fn connect(&self, events: Sender<PushEvent>) -> Result<(), TransportError> {
        self.disconnect().await;

        let (client, mut event_loop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);

        // The session only exists once the broker acknowledged it
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) if ack.code == ConnectReturnCode::Success => break,
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return Err(TransportError::Handshake(format!("broker refused the connection: {:?}", ack.code)));
                }
                Ok(_) => continue,
                Err(e) => return Err(TransportError::Handshake(e.to_string())),
            }
        }
        info!("Broker accepted the session");

        *self.event_loop.lock().await = Some(tokio::spawn(drive(event_loop, events)));
        *self.client.lock().await = Some(client);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.client()
            .await?
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| TransportError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        debug!(topic, %payload, "Publishing");
        self.client()
            .await?
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| TransportError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&self) {
        if let Some(client) = self.client.lock().await.take() {
            if let Err(e) = client.try_disconnect() {
                debug!("Could not request a clean disconnect: {}", e);
            }
        }

        if let Some(event_loop) = self.event_loop.lock().await.take() {
            event_loop.abort();
        }
    }
}

// Forwards incoming publishes until the session breaks
async fn drive(mut event_loop: EventLoop, events: Sender<PushEvent>) {
    loop {
        let event = match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => PushEvent::Message {
                topic: publish.topic.clone(),
                payload: String::from_utf8_lossy(&publish.payload).into_owned(),
            },
            Ok(Event::Incoming(Packet::Disconnect)) => PushEvent::ConnectionLost("broker closed the session".to_string()),
            Ok(_) => continue,
            Err(e) => {
                warn!("🔴 MQTT event loop stopped: {}", e);
                PushEvent::ConnectionLost(e.to_string())
            }
        };

        let lost = matches!(event, PushEvent::ConnectionLost(_));
        if events.send(event).await.is_err() || lost {
            break;
        }
    }
}
