//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     provides a unified interface for the two pieces of hardware the device
//!     owns: the LED output pin and the ultrasonic distance sensor.
//!     abstracts away the difference between running on a real Raspberry Pi
//!     (using `rppal`) and a development machine (using an in-memory mock).
//!
//! relationships:
//!     - used by: device.rs (gpio endpoints), main.rs (pin setup)
//!     - uses: rppal (on feature="hardware")
//!
//! ==============================================================================

use crate::config::{PanelConfig, SensorConfig};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// speed of sound in cm per microsecond at ~20°C
const SOUND_CM_PER_US: f64 = 0.0343;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

pub trait HardwareProvider: Send + Sync {
    fn set_gpio_mode(&self, pin: u8, mode: PinMode) -> Result<()>;
    fn write_gpio(&self, pin: u8, level: bool) -> Result<()>;
    fn read_gpio(&self, pin: u8) -> Result<bool>;
    /// one blocking measurement; call from `spawn_blocking`
    fn read_distance_cm(&self, sensor: &SensorConfig) -> Result<f64>;
}

/// Pick the backend for this build.
pub fn build(config: &PanelConfig) -> Result<Arc<dyn HardwareProvider>> {
    #[cfg(feature = "hardware")]
    {
        let _ = config;
        Ok(Arc::new(RpiHal::new()?))
    }
    #[cfg(not(feature = "hardware"))]
    {
        Ok(Arc::new(MockHal::new(config.sensor.mock_distance_cm)))
    }
}

/// convert the width of an echo pulse to a distance, rounded to 0.1 cm.
/// the pulse covers the way there and back.
pub fn echo_to_cm(echo: Duration) -> f64 {
    let us = echo.as_secs_f64() * 1_000_000.0;
    let cm = us * SOUND_CM_PER_US / 2.0;
    (cm * 10.0).round() / 10.0
}

// ==============================================================================================
// MOCK IMPLEMENTATION (For Non-Hardware Build and tests)
// ==============================================================================================

#[derive(Debug, Default)]
struct MockPins {
    modes: HashMap<u8, PinMode>,
    levels: HashMap<u8, bool>,
    writes: usize,
}

pub struct MockHal {
    pins: Mutex<MockPins>,
    distance: Mutex<std::result::Result<f64, String>>,
    write_failure: Mutex<Option<String>>,
}

impl MockHal {
    pub fn new(distance_cm: f64) -> Self {
        tracing::info!("Using MOCK HAL (No hardware access)");
        Self {
            pins: Mutex::new(MockPins::default()),
            distance: Mutex::new(Ok(distance_cm)),
            write_failure: Mutex::new(None),
        }
    }

    pub fn set_distance(&self, cm: f64) {
        if let Ok(mut d) = self.distance.lock() {
            *d = Ok(cm);
        }
    }

    /// make every following sensor read fail with `message`
    pub fn fail_sensor(&self, message: impl Into<String>) {
        if let Ok(mut d) = self.distance.lock() {
            *d = Err(message.into());
        }
    }

    /// make every following pin write fail with `message`
    pub fn fail_writes(&self, message: impl Into<String>) {
        if let Ok(mut f) = self.write_failure.lock() {
            *f = Some(message.into());
        }
    }

    pub fn level(&self, pin: u8) -> Option<bool> {
        self.pins.lock().ok()?.levels.get(&pin).copied()
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.pins.lock().ok()?.modes.get(&pin).copied()
    }

    pub fn write_count(&self) -> usize {
        self.pins.lock().map(|p| p.writes).unwrap_or(0)
    }

    fn pins(&self) -> Result<std::sync::MutexGuard<'_, MockPins>> {
        self.pins.lock().map_err(|_| anyhow!("mock pin state poisoned"))
    }
}

impl HardwareProvider for MockHal {
    fn set_gpio_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        tracing::debug!("[MOCK GPIO] Pin {} set to {:?}", pin, mode);
        self.pins()?.modes.insert(pin, mode);
        Ok(())
    }

    fn write_gpio(&self, pin: u8, level: bool) -> Result<()> {
        tracing::debug!("[MOCK GPIO] Pin {} write {}", pin, level);
        let failure = self
            .write_failure
            .lock()
            .map_err(|_| anyhow!("mock write state poisoned"))?
            .clone();
        if let Some(message) = failure {
            anyhow::bail!(message);
        }
        let mut pins = self.pins()?;
        pins.levels.insert(pin, level);
        pins.writes += 1;
        Ok(())
    }

    fn read_gpio(&self, pin: u8) -> Result<bool> {
        Ok(self.pins()?.levels.get(&pin).copied().unwrap_or(false))
    }

    fn read_distance_cm(&self, sensor: &SensorConfig) -> Result<f64> {
        tracing::debug!(
            "[MOCK SENSOR] trigger {} echo {}",
            sensor.trigger_pin,
            sensor.echo_pin
        );
        let distance = self
            .distance
            .lock()
            .map_err(|_| anyhow!("mock sensor state poisoned"))?;
        distance.clone().map_err(|e| anyhow!(e))
    }
}

// ==============================================================================================
// REAL IMPLEMENTATION (For Raspberry Pi)
// ==============================================================================================

#[cfg(feature = "hardware")]
pub struct RpiHal {
    gpio: rppal::gpio::Gpio,
    // output pins stay claimed so their level survives between requests
    outputs: Mutex<HashMap<u8, rppal::gpio::OutputPin>>,
}

#[cfg(feature = "hardware")]
impl RpiHal {
    pub fn new() -> Result<Self> {
        tracing::info!("Using REAL HARDWARE HAL (rppal)");
        Ok(Self {
            gpio: rppal::gpio::Gpio::new()?,
            outputs: Mutex::new(HashMap::new()),
        })
    }

    fn outputs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u8, rppal::gpio::OutputPin>>> {
        self.outputs.lock().map_err(|_| anyhow!("gpio pin table poisoned"))
    }
}

#[cfg(feature = "hardware")]
impl HardwareProvider for RpiHal {
    fn set_gpio_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        let mut outputs = self.outputs()?;
        match mode {
            PinMode::Output => {
                if !outputs.contains_key(&pin) {
                    let mut p = self.gpio.get(pin)?.into_output();
                    // keep the pin driven after the handle is dropped at shutdown
                    p.set_reset_on_drop(false);
                    outputs.insert(pin, p);
                }
            }
            PinMode::Input => {
                outputs.remove(&pin);
            }
        }
        Ok(())
    }

    fn write_gpio(&self, pin: u8, level: bool) -> Result<()> {
        let mut outputs = self.outputs()?;
        if !outputs.contains_key(&pin) {
            let mut p = self.gpio.get(pin)?.into_output();
            p.set_reset_on_drop(false);
            outputs.insert(pin, p);
        }
        let p = outputs
            .get_mut(&pin)
            .ok_or_else(|| anyhow!("pin {} not configured", pin))?;
        if level { p.set_high(); } else { p.set_low(); }
        Ok(())
    }

    fn read_gpio(&self, pin: u8) -> Result<bool> {
        if let Some(p) = self.outputs()?.get(&pin) {
            return Ok(p.is_set_high());
        }
        Ok(self.gpio.get(pin)?.into_input().is_high())
    }

    fn read_distance_cm(&self, sensor: &SensorConfig) -> Result<f64> {
        use std::thread::sleep;
        use std::time::Instant;

        let mut trigger = self.gpio.get(sensor.trigger_pin)?.into_output_low();
        let echo = self.gpio.get(sensor.echo_pin)?.into_input();
        let timeout = sensor.timeout();

        sleep(Duration::from_micros(2));
        trigger.set_high();
        sleep(Duration::from_micros(10));
        trigger.set_low();

        let waiting = Instant::now();
        while echo.is_low() {
            if waiting.elapsed() > timeout {
                anyhow::bail!("no echo from sensor");
            }
        }

        let start = Instant::now();
        while echo.is_high() {
            if start.elapsed() > timeout {
                anyhow::bail!("echo pulse too long (out of range)");
            }
        }

        Ok(echo_to_cm(start.elapsed()))
    }
}
