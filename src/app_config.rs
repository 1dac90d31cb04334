use crate::domain::HardwareTestEndpoint;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    backend: Backend,
    push: Push,
    polling: Polling,
    hardware: Hardware,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("ALARM").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn push(&self) -> &Push {
        &self.push
    }

    pub fn polling(&self) -> &Polling {
        &self.polling
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hardware
    }
}

#[derive(Debug, Deserialize)]
pub struct Core {
    event_buffer_size: usize,
}

impl Core {
    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }
}

#[derive(Debug, Deserialize)]
pub struct Backend {
    url: String,
    #[serde(with = "humantime_serde")]
    request_timeout: Duration,
    probe_attempts: usize,
    #[serde(with = "humantime_serde")]
    probe_interval: Duration,
}

impl Backend {
    pub fn url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn probe_attempts(&self) -> usize {
        self.probe_attempts
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushTransport {
    Tcp,
    Websocket,
}

#[derive(Debug, Deserialize)]
pub struct Push {
    host: String,
    port: u16,
    path: String,
    transport: PushTransport,
    client_id_prefix: String,
    #[serde(with = "humantime_serde")]
    connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    reconnect_delay: Duration,
    #[serde(with = "humantime_serde")]
    hardware_response_timeout: Duration,
}

impl Push {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn transport(&self) -> PushTransport {
        self.transport
    }

    pub fn client_id_prefix(&self) -> &str {
        &self.client_id_prefix
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn hardware_response_timeout(&self) -> Duration {
        self.hardware_response_timeout
    }
}

#[derive(Debug, Deserialize)]
pub struct Polling {
    #[serde(with = "humantime_serde")]
    alarms: Duration,
    #[serde(with = "humantime_serde")]
    sensors: Duration,
    #[serde(with = "humantime_serde")]
    alarm_state: Duration,
    #[serde(with = "humantime_serde")]
    output: Duration,
    #[serde(default)]
    change_detection: bool,
}

impl Polling {
    pub fn alarms(&self) -> Duration {
        self.alarms
    }

    pub fn sensors(&self) -> Duration {
        self.sensors
    }

    pub fn alarm_state(&self) -> Duration {
        self.alarm_state
    }

    pub fn output(&self) -> Duration {
        self.output
    }

    pub fn change_detection(&self) -> bool {
        self.change_detection
    }
}

#[derive(Debug, Deserialize)]
pub struct Hardware {
    primary_endpoint: HardwareTestEndpoint,
    fallback_endpoint: HardwareTestEndpoint,
}

impl Hardware {
    pub fn primary_endpoint(&self) -> HardwareTestEndpoint {
        self.primary_endpoint
    }

    pub fn fallback_endpoint(&self) -> HardwareTestEndpoint {
        self.fallback_endpoint
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core { event_buffer_size: 256 },
                backend: Backend {
                    url: "http://backend.local".to_string(),
                    request_timeout: Duration::from_secs(5),
                    probe_attempts: 3,
                    probe_interval: Duration::from_millis(100),
                },
                push: Push {
                    host: "broker.local".to_string(),
                    port: 9001,
                    path: "/mqtt".to_string(),
                    transport: PushTransport::Websocket,
                    client_id_prefix: "test_client".to_string(),
                    connect_timeout: Duration::from_secs(10),
                    reconnect_delay: Duration::from_secs(5),
                    hardware_response_timeout: Duration::from_secs(10),
                },
                polling: Polling {
                    alarms: Duration::from_secs(5),
                    sensors: Duration::from_secs(2),
                    alarm_state: Duration::from_secs(1),
                    output: Duration::from_millis(500),
                    change_detection: false,
                },
                hardware: Hardware {
                    primary_endpoint: HardwareTestEndpoint::TestHardwareFixed,
                    fallback_endpoint: HardwareTestEndpoint::SimpleTest,
                },
            },
        }
    }

    pub fn backend_url(mut self, url: String) -> Self {
        self.config.backend.url = url;
        self
    }

    pub fn change_detection(mut self, enabled: bool) -> Self {
        self.config.polling.change_detection = enabled;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_human_readable_durations() -> Result<(), ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(include_str!("../config.toml"), config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        assert_eq!(config.polling().alarms(), Duration::from_secs(5));
        assert_eq!(config.polling().output(), Duration::from_millis(500));
        assert_eq!(config.push().connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.push().transport(), PushTransport::Websocket);
        assert_eq!(config.hardware().fallback_endpoint(), HardwareTestEndpoint::SimpleTest);
        Ok(())
    }

    #[test]
    fn strips_a_trailing_slash_from_the_backend_url() {
        let config = AppConfigBuilder::new().backend_url("http://pi.local:5000/".to_string()).build();
        assert_eq!(config.backend().url(), "http://pi.local:5000");
    }
}
