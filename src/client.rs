//! ==============================================================================
//! client.rs - http access to the device's gpio endpoints
//! ==============================================================================
//!
//! purpose:
//!     the panel never talks to reqwest directly; it goes through `DeviceApi`
//!     so tests can count and script requests without a network.
//!
//! relationships:
//!     - used by: panel.rs (ControlPanel<A: DeviceApi>)
//!     - talks to: device.rs (POST /gpio/on, /gpio/off, /gpio/sensor)
//!
//! ==============================================================================

use crate::config::PanelClientConfig;
use crate::domain::{LedCommand, SensorReply};
use crate::error::ClientError;
use std::future::Future;

pub const SENSOR_PATH: &str = "/gpio/sensor";

pub trait DeviceApi: Send + Sync {
    /// one POST to the command's path. completes on any HTTP status.
    fn send_command(&self, cmd: LedCommand) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// one POST to `/gpio/sensor`, decoding the JSON reply of a 2xx answer
    fn fetch_sensor(&self) -> impl Future<Output = Result<SensorReply, ClientError>> + Send;
}

/// `DeviceApi` over HTTP
#[derive(Clone)]
pub struct HttpDevice {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDevice {
    pub fn new(config: &PanelClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::Build)?;
        Ok(Self::with_client(http, &config.device_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &'static str) -> Result<reqwest::Response, ClientError> {
        tracing::debug!(path, "POST");
        self.http
            .post(self.url(path))
            .send()
            .await
            .map_err(|source| ClientError::Http { path, source })
    }
}

impl DeviceApi for HttpDevice {
    async fn send_command(&self, cmd: LedCommand) -> Result<(), ClientError> {
        // the body is never read and the status never inspected
        self.post(cmd.path()).await.map(|_| ())
    }

    async fn fetch_sensor(&self) -> Result<SensorReply, ClientError> {
        let response = self.post(SENSOR_PATH).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                path: SENSOR_PATH,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Http { path: SENSOR_PATH, source })?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            path: SENSOR_PATH,
            source,
        })
    }
}
