use crate::backend::responses::{AlarmsFingerprint, AlarmsResponse, OutputResponse, ScriptStatus, StatusResponse};
use crate::backend::{Backend, BackendError};
use crate::domain::{AlarmActiveState, AlarmEntry, AlarmTime, ComponentTest, HardwareResponse, HardwareStatus, HardwareTestEndpoint, SensorSnapshot};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{instrument, trace};

#[derive(Debug, Serialize)]
struct AddAlarmBody {
    hour: u32,
    minute: u32,
    second: u32,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    url: String,
}

impl HttpBackend {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        HttpBackend { client, url: url.into() }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        self.execute(path, self.client.get(format!("{}{}", self.url, path))).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        self.execute(path, self.client.post(format!("{}{}", self.url, path))).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, BackendError> {
        self.execute(path, self.client.post(format!("{}{}", self.url, path)).json(body)).await
    }

    async fn execute<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T, BackendError> {
        let to_error = |source| BackendError::Request { path: path.to_string(), source };

        let response = request.send().await.map_err(to_error)?;
        let status = response.status();
        trace!(path, status = %status, "Backend responded");

        if !status.is_success() {
            return Err(BackendError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(to_error)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self))]
    async fn alarms(&self) -> Result<Vec<AlarmEntry>, BackendError> {
        let response = self.get::<AlarmsResponse>("/alarms").await?;
        if response.status != "success" {
            return Err(BackendError::Rejected(response.message.unwrap_or_else(|| "could not load alarms".to_string())));
        }

        Ok(response.alarms)
    }

    async fn alarms_fingerprint(&self) -> Result<AlarmsFingerprint, BackendError> {
        self.get("/check_alarms_updated").await
    }

    #[instrument(skip_all, fields(time = %time))]
    async fn add_alarm(&self, time: AlarmTime) -> Result<StatusResponse, BackendError> {
        let body = AddAlarmBody {
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        };
        self.post_json("/alarm", &body).await
    }

    #[instrument(skip(self))]
    async fn delete_alarm(&self, index: usize) -> Result<StatusResponse, BackendError> {
        let path = format!("/alarm/{index}");
        self.execute(&path, self.client.delete(format!("{}{}", self.url, path))).await
    }

    #[instrument(skip(self))]
    async fn toggle_alarm(&self, index: usize) -> Result<StatusResponse, BackendError> {
        self.post(&format!("/alarm/{index}/toggle")).await
    }

    async fn alarm_state(&self) -> Result<AlarmActiveState, BackendError> {
        self.get("/alarm_state").await
    }

    #[instrument(skip(self))]
    async fn snooze(&self) -> Result<StatusResponse, BackendError> {
        self.post("/snooze").await
    }

    async fn sensor_data(&self) -> Result<SensorSnapshot, BackendError> {
        self.get("/sensor_data").await
    }

    async fn hardware_status(&self) -> Result<HardwareStatus, BackendError> {
        self.get("/hardware_status").await
    }

    #[instrument(skip_all, fields(endpoint = %endpoint, component = %test.component))]
    async fn test_hardware(&self, endpoint: HardwareTestEndpoint, test: &ComponentTest) -> Result<HardwareResponse, BackendError> {
        self.post_json(endpoint.path(), test).await
    }

    async fn output(&self) -> Result<OutputResponse, BackendError> {
        self.get("/output").await
    }

    #[instrument(skip(self))]
    async fn start_script(&self) -> Result<StatusResponse, BackendError> {
        self.post("/start").await
    }

    #[instrument(skip(self))]
    async fn stop_script(&self) -> Result<StatusResponse, BackendError> {
        self.post("/stop").await
    }

    async fn script_status(&self) -> Result<ScriptStatus, BackendError> {
        self.get("/status").await
    }
}
