use crate::app_config::AppConfig;
use crate::domain::HardwareTestEndpoint;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub hardware_response_timeout: Duration,
    pub alarms_interval: Duration,
    pub sensors_interval: Duration,
    pub alarm_state_interval: Duration,
    pub output_interval: Duration,
    pub change_detection: bool,
    pub primary_endpoint: HardwareTestEndpoint,
    pub fallback_endpoint: HardwareTestEndpoint,
}

impl From<&AppConfig> for TransportSettings {
    fn from(config: &AppConfig) -> Self {
        TransportSettings {
            connect_timeout: config.push().connect_timeout(),
            reconnect_delay: config.push().reconnect_delay(),
            hardware_response_timeout: config.push().hardware_response_timeout(),
            alarms_interval: config.polling().alarms(),
            sensors_interval: config.polling().sensors(),
            alarm_state_interval: config.polling().alarm_state(),
            output_interval: config.polling().output(),
            change_detection: config.polling().change_detection(),
            primary_endpoint: config.hardware().primary_endpoint(),
            fallback_endpoint: config.hardware().fallback_endpoint(),
        }
    }
}
