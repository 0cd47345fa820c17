//! typed errors for the panel client and the device host.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;

/// why a request from the panel to the device failed
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {path} failed: {source}")]
    Http {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} answered with HTTP {status}")]
    Status { path: &'static str, status: u16 },
    #[error("{path} returned a body that is not valid JSON: {source}")]
    Decode {
        path: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// failures inside the device host, all answered with a 500
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to open {}: {source}", .path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("gpio {pin}: {cause:#}")]
    Gpio { pin: u8, cause: anyhow::Error },
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for DeviceError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
