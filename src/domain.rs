//! ==============================================================================
//! domain.rs - buttons, led commands and sensor replies
//! ==============================================================================
//!
//! purpose:
//!     the small vocabulary shared by the device host (device.rs) and the
//!     control panel (panel.rs, client.rs). no io lives here.
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};

/// class toggled on the page body by the mode button
pub const DARK_MODE_CLASS: &str = "darkMode";

/// shown while a sensor request is in flight
pub const FETCHING_TEXT: &str = "Fetching data...";

/// shown when the device could not be reached or answered with a non-2xx status
pub const COMM_ERROR_TEXT: &str = "CHYBA komunikace!";

/// prefix for errors reported by the device itself
pub const DEVICE_ERROR_PREFIX: &str = "Chyba: ";

/// the page elements the panel binds to, addressed by their DOM id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Mode,
    LedOn,
    LedOff,
    Sensor,
    /// the text element holding the reading; clicking it does nothing
    SensorDistance,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::Mode,
        Button::LedOn,
        Button::LedOff,
        Button::Sensor,
        Button::SensorDistance,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Button::Mode => "modeButton",
            Button::LedOn => "ledOn",
            Button::LedOff => "ledOff",
            Button::Sensor => "sensor",
            Button::SensorDistance => "sensor-distance",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.id() == id)
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// switch the led on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    /// endpoint on the device
    pub fn path(self) -> &'static str {
        match self {
            LedCommand::On => "/gpio/on",
            LedCommand::Off => "/gpio/off",
        }
    }

    /// logged by the panel once the request completes
    pub fn log_line(self) -> &'static str {
        match self {
            LedCommand::On => "LED ON",
            LedCommand::Off => "LED OFF",
        }
    }

    /// output level for the led pin.
    /// active-low wiring lights the led when the pin is low.
    pub fn level(self, active_low: bool) -> bool {
        match self {
            LedCommand::On => !active_low,
            LedCommand::Off => active_low,
        }
    }
}

/// json body of `POST /gpio/sensor`
///
/// the device sends either `{"distance_cm": n}` or `{"error": "..."}`.
/// both fields are optional on the wire so a partial body still decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SensorReply {
    pub fn distance(cm: f64) -> Self {
        Self { distance_cm: Some(cm), error: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { distance_cm: None, error: Some(message.into()) }
    }

    /// text for the `sensor-distance` element.
    ///
    /// a distance wins over an error; `None` leaves the display untouched.
    pub fn render(&self) -> Option<String> {
        if let Some(cm) = self.distance_cm {
            // f64's Display prints whole numbers without a fraction, like js
            Some(format!("{} cm", cm))
        } else {
            self.error
                .as_ref()
                .map(|e| format!("{}{}", DEVICE_ERROR_PREFIX, e))
        }
    }
}
