//! HTTP client for the pull side of the sync engine
//!
//! The data source is consumed as a plain request/response contract behind
//! the [`DataSource`] trait so tests can substitute an in-memory fake.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{SyncConfig, SyncError, SyncResult};
use shared::{Device, Sensor, SensorReading};

/// Pull-side contract of the data source
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn list_devices(&self) -> SyncResult<Vec<Device>>;
    async fn list_sensors_for_device(&self, device_id: i64) -> SyncResult<Vec<Sensor>>;
    async fn list_sensor_readings_for_device(
        &self,
        device_id: i64,
    ) -> SyncResult<Vec<SensorReading>>;
}

/// HTTP client for making network requests to the data source
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &SyncConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.api_base_url.clone(),
        }
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> SyncResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::FetchFailed(format!("{}: {}", status, text)));
        }

        response.json().await.map_err(Into::into)
    }
}

#[async_trait]
impl DataSource for HttpClient {
    async fn list_devices(&self) -> SyncResult<Vec<Device>> {
        self.get("devices").await
    }

    async fn list_sensors_for_device(&self, device_id: i64) -> SyncResult<Vec<Sensor>> {
        self.get(&format!("device-sensors?device_id={}", device_id))
            .await
    }

    async fn list_sensor_readings_for_device(
        &self,
        device_id: i64,
    ) -> SyncResult<Vec<SensorReading>> {
        self.get(&format!("device-sensor-data?device_id={}", device_id))
            .await
    }
}
