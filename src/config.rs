//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `panel.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the device host listens.
//!     - GpioConfig: LED pin and its wiring polarity.
//!     - SensorConfig: ultrasonic trigger/echo pins and timeout.
//!     - AssetsConfig: directory holding index.html, styling.css, index.js.
//!     - PanelClientConfig: which device the control panel talks to.
//!     - LoggingConfig: default log level.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// env var pointing at an explicit config file
pub const CONFIG_ENV: &str = "PANEL_CONFIG";

/// what happened while looking for a config file
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    Loaded(PathBuf),
    /// `PANEL_CONFIG` names a file that does not exist
    Missing(PathBuf),
    Failed { path: PathBuf, error: String },
    Defaults,
}

impl ConfigEvent {
    pub fn log(&self) {
        match self {
            ConfigEvent::Loaded(path) => tracing::info!(path = %path.display(), "config loaded"),
            ConfigEvent::Missing(path) => {
                tracing::warn!(path = %path.display(), "{} points at a missing file", CONFIG_ENV)
            }
            ConfigEvent::Failed { path, error } => {
                tracing::warn!(path = %path.display(), error = %error, "failed to load config")
            }
            ConfigEvent::Defaults => tracing::warn!("no config file found - using defaults"),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PanelConfig {
    pub server: ServerConfig,
    pub gpio: GpioConfig,
    pub sensor: SensorConfig,
    pub assets: AssetsConfig,
    pub panel: PanelClientConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GpioConfig {
    pub led_pin: u8,
    /// led lights when the pin is driven low
    pub active_low: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self { led_pin: 4, active_low: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub timeout_ms: u64,
    /// distance reported by the mock hal
    pub mock_distance_cm: f64,
}

impl SensorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            trigger_pin: 5,
            echo_pin: 18,
            timeout_ms: 30,
            mock_distance_cm: 42.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssetsConfig {
    pub dir: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("assets") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PanelClientConfig {
    pub device_url: String,
    /// none by default: a browser fetch never times out on its own
    pub request_timeout_ms: Option<u64>,
}

impl PanelClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PanelClientConfig {
    fn default() -> Self {
        Self {
            device_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl PanelConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load with default fallback.
    ///
    /// `PANEL_CONFIG` wins; otherwise `config/panel.toml` then `../config/panel.toml`.
    /// nothing is logged here: logging is usually not set up yet, so the
    /// returned events are replayed once it is.
    pub fn load_or_default() -> (Self, Vec<ConfigEvent>) {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let candidates = [
            PathBuf::from("config").join("panel.toml"),
            PathBuf::from("..").join("config").join("panel.toml"),
        ];
        Self::load_first(explicit, &candidates)
    }

    /// first loadable file wins. an explicit path that does not exist is
    /// reported, a missing candidate is not.
    pub fn load_first(explicit: Option<PathBuf>, candidates: &[PathBuf]) -> (Self, Vec<ConfigEvent>) {
        let mut events = Vec::new();

        if let Some(path) = explicit {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => {
                        events.push(ConfigEvent::Loaded(path));
                        return (config, events);
                    }
                    Err(e) => events.push(ConfigEvent::Failed { path, error: format!("{:#}", e) }),
                }
            } else {
                events.push(ConfigEvent::Missing(path));
            }
        }

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load(path) {
                Ok(config) => {
                    events.push(ConfigEvent::Loaded(path.clone()));
                    return (config, events);
                }
                Err(e) => events.push(ConfigEvent::Failed {
                    path: path.clone(),
                    error: format!("{:#}", e),
                }),
            }
        }

        events.push(ConfigEvent::Defaults);
        (Self::default(), events)
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            bind = %self.server.bind,
            led_pin = self.gpio.led_pin,
            active_low = self.gpio.active_low,
            trigger_pin = self.sensor.trigger_pin,
            echo_pin = self.sensor.echo_pin,
            assets = %self.assets.dir.display(),
            device_url = %self.panel.device_url,
            level = %self.logging.level,
            "configuration"
        );
    }
}
