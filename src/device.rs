//! ==============================================================================
//! device.rs - the device's web server
//! ==============================================================================
//!
//! purpose:
//!     serves the control page and its assets, and exposes the gpio endpoints
//!     the page posts to.
//!
//! routes:
//!     GET  /              index.html
//!     GET  /styling.css   stylesheet
//!     GET  /index.js      panel script
//!     POST /gpio/on       led on, 204
//!     POST /gpio/off      led off, 204
//!     POST /gpio/sensor   {"distance_cm": n} or {"error": "..."}
//!
//! relationships:
//!     - uses: hal.rs (pin writes and sensor reads, off the async runtime)
//!     - used by: main.rs (serves the router), tests/end_to_end.rs
//!
//! ==============================================================================

use crate::config::PanelConfig;
use crate::domain::{LedCommand, SensorReply};
use crate::error::DeviceError;
use crate::hal::{HardwareProvider, PinMode};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct DeviceState {
    pub hal: Arc<dyn HardwareProvider>,
    pub config: Arc<PanelConfig>,
}

impl DeviceState {
    pub fn new(hal: Arc<dyn HardwareProvider>, config: PanelConfig) -> Self {
        Self { hal, config: Arc::new(config) }
    }
}

/// a file from the asset directory and the content type it is served with
struct Asset {
    file: &'static str,
    content_type: &'static str,
}

const INDEX_HTML: Asset = Asset { file: "index.html", content_type: "text/html" };
const STYLING_CSS: Asset = Asset { file: "styling.css", content_type: "text/css" };
const INDEX_JS: Asset = Asset { file: "index.js", content_type: "application/javascript" };

pub fn router(state: DeviceState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/styling.css", get(css_handler))
        .route("/index.js", get(js_handler))
        .route("/gpio/on", post(gpio_on_handler))
        .route("/gpio/off", post(gpio_off_handler))
        .route("/gpio/sensor", post(sensor_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// put the led pin into output mode. called once before serving.
pub fn init_gpio(hal: &dyn HardwareProvider, config: &PanelConfig) -> anyhow::Result<()> {
    hal.set_gpio_mode(config.gpio.led_pin, PinMode::Output)?;
    tracing::info!(pin = config.gpio.led_pin, "led pin ready");
    Ok(())
}

// ==============================================================================
// static assets
// ==============================================================================

async fn index_handler(State(state): State<DeviceState>) -> Result<Response, DeviceError> {
    serve_asset(&state, &INDEX_HTML).await
}

async fn css_handler(State(state): State<DeviceState>) -> Result<Response, DeviceError> {
    serve_asset(&state, &STYLING_CSS).await
}

async fn js_handler(State(state): State<DeviceState>) -> Result<Response, DeviceError> {
    serve_asset(&state, &INDEX_JS).await
}

async fn serve_asset(state: &DeviceState, asset: &Asset) -> Result<Response, DeviceError> {
    let path: PathBuf = state.config.assets.dir.join(asset.file);
    let body = tokio::fs::read(&path)
        .await
        .map_err(|source| DeviceError::Asset { path, source })?;
    Ok(([(header::CONTENT_TYPE, asset.content_type)], body).into_response())
}

// ==============================================================================
// gpio
// ==============================================================================

async fn gpio_on_handler(State(state): State<DeviceState>) -> Result<StatusCode, DeviceError> {
    switch_led(&state, LedCommand::On).await?;
    tracing::info!("LED/GPIO ON by web request");
    Ok(StatusCode::NO_CONTENT)
}

async fn gpio_off_handler(State(state): State<DeviceState>) -> Result<StatusCode, DeviceError> {
    switch_led(&state, LedCommand::Off).await?;
    tracing::info!("LED/GPIO OFF by web request");
    Ok(StatusCode::NO_CONTENT)
}

async fn switch_led(state: &DeviceState, cmd: LedCommand) -> Result<(), DeviceError> {
    let pin = state.config.gpio.led_pin;
    let level = cmd.level(state.config.gpio.active_low);
    let hal = state.hal.clone();
    tokio::task::spawn_blocking(move || hal.write_gpio(pin, level))
        .await?
        .map_err(|cause| DeviceError::Gpio { pin, cause })
}

/// a failed measurement is still a 200: the panel shows the device's message
async fn sensor_handler(State(state): State<DeviceState>) -> Result<Json<SensorReply>, DeviceError> {
    let hal = state.hal.clone();
    let config = state.config.clone();
    let reading = tokio::task::spawn_blocking(move || hal.read_distance_cm(&config.sensor)).await?;

    let reply = match reading {
        Ok(cm) => {
            tracing::debug!(distance_cm = cm, "sensor read");
            SensorReply::distance(cm)
        }
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "sensor read failed");
            SensorReply::failure(e.to_string())
        }
    };
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockHal;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn setup(assets: PathBuf) -> (Arc<MockHal>, Router) {
        let hal = Arc::new(MockHal::new(42.0));
        let mut config = PanelConfig::default();
        config.assets.dir = assets;
        let app = router(DeviceState::new(hal.clone(), config));
        (hal, app)
    }

    fn asset_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_gpio_on_drives_pin_low() {
        let (hal, app) = setup(asset_dir());
        let resp = send(app, Method::POST, "/gpio/on").await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(hal.level(4), Some(false));
        assert!(body_string(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_gpio_off_drives_pin_high() {
        let (hal, app) = setup(asset_dir());
        let resp = send(app, Method::POST, "/gpio/off").await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(hal.level(4), Some(true));
    }

    #[tokio::test]
    async fn test_gpio_write_failure_is_500() {
        let (hal, app) = setup(asset_dir());
        hal.fail_writes("pin busy");

        let resp = send(app.clone(), Method::POST, "/gpio/on").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = send(app, Method::POST, "/gpio/off").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(hal.level(4), None);
        assert_eq!(hal.write_count(), 0);
    }

    #[tokio::test]
    async fn test_gpio_get_not_allowed() {
        let (hal, app) = setup(asset_dir());
        let resp = send(app, Method::GET, "/gpio/on").await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(hal.write_count(), 0);
    }

    #[tokio::test]
    async fn test_sensor_reports_distance() {
        let (_hal, app) = setup(asset_dir());
        let resp = send(app, Method::POST, "/gpio/sensor").await;

        assert_eq!(resp.status(), StatusCode::OK);
        let reply: SensorReply = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(reply, SensorReply::distance(42.0));
    }

    #[tokio::test]
    async fn test_sensor_failure_is_json_error() {
        let (hal, app) = setup(asset_dir());
        hal.fail_sensor("no echo from sensor");
        let resp = send(app, Method::POST, "/gpio/sensor").await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body, serde_json::json!({"error": "no echo from sensor"}));
    }

    #[tokio::test]
    async fn test_assets_served_with_content_type() {
        for (uri, ct, needle) in [
            ("/", "text/html", "modeButton"),
            ("/styling.css", "text/css", "darkMode"),
            ("/index.js", "application/javascript", "/gpio/sensor"),
        ] {
            let (_hal, app) = setup(asset_dir());
            let resp = send(app, Method::GET, uri).await;

            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
            assert_eq!(resp.headers()[header::CONTENT_TYPE], ct);
            assert!(body_string(resp).await.contains(needle), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_missing_asset_is_500() {
        let (_hal, app) = setup(PathBuf::from("/definitely/not/here"));
        let resp = send(app, Method::GET, "/").await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_init_gpio_sets_output() {
        let hal = MockHal::new(1.0);
        init_gpio(&hal, &PanelConfig::default()).unwrap();
        assert_eq!(hal.mode(4), Some(PinMode::Output));
    }
}
