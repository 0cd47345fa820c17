//! ==============================================================================
//! gpio-panel - led and distance sensor over http
//! ==============================================================================
//!
//! two halves of one small system:
//!     - the device host (device.rs + hal.rs): serves the control page and
//!       drives the led pin / reads the ultrasonic sensor.
//!     - the control panel (panel.rs + client.rs): the buttons of that page,
//!       talking to the host over http.
//!
//! ==============================================================================

pub mod client;
pub mod config;
pub mod device;
pub mod domain;
pub mod error;
pub mod hal;
pub mod logging;
pub mod panel;
