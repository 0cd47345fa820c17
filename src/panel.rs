//! ==============================================================================
//! panel.rs - device control panel
//! ==============================================================================
//!
//! purpose:
//!     the buttons of the control page and what each click does:
//!     - modeButton: flip the `darkMode` class on the page body
//!     - ledOn / ledOff: one POST to the device, log when it completes
//!     - sensor: show "Fetching data...", POST for a reading, render it
//!
//! concurrency:
//!     every click is independent. nothing orders or cancels in-flight
//!     requests, so when two sensor reads overlap the one that resolves
//!     last owns the text.
//!
//! relationships:
//!     - uses: client.rs (DeviceApi), domain.rs (texts and ids)
//!     - used by: bin/panel.rs (interactive shell)
//!
//! ==============================================================================

use crate::client::DeviceApi;
use crate::domain::{Button, LedCommand, COMM_ERROR_TEXT, DARK_MODE_CLASS, FETCHING_TEXT};
use crate::error::ClientError;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// what the page currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub body_classes: BTreeSet<String>,
    /// text of the `sensor-distance` element
    pub sensor_text: String,
}

pub struct ControlPanel<A> {
    api: A,
    page: Mutex<Page>,
}

impl<A: DeviceApi> ControlPanel<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            page: Mutex::new(Page::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Dispatch a click on `button`.
    ///
    /// only led clicks can fail; their error is passed through untouched.
    pub async fn click(&self, button: Button) -> Result<(), ClientError> {
        match button {
            Button::Mode => self.toggle_mode(),
            Button::LedOn => self.led_on().await?,
            Button::LedOff => self.led_off().await?,
            Button::Sensor => self.read_sensor().await,
            Button::SensorDistance => {}
        }
        Ok(())
    }

    pub fn toggle_mode(&self) {
        let mut page = self.page();
        if !page.body_classes.remove(DARK_MODE_CLASS) {
            page.body_classes.insert(DARK_MODE_CLASS.to_string());
        }
    }

    pub async fn led_on(&self) -> Result<(), ClientError> {
        self.led(LedCommand::On).await
    }

    pub async fn led_off(&self) -> Result<(), ClientError> {
        self.led(LedCommand::Off).await
    }

    async fn led(&self, cmd: LedCommand) -> Result<(), ClientError> {
        self.api.send_command(cmd).await?;
        tracing::info!("{}", cmd.log_line());
        Ok(())
    }

    /// Fetch and render a distance reading. Failures end up on the page.
    pub async fn read_sensor(&self) {
        self.set_sensor_text(FETCHING_TEXT);

        match self.api.fetch_sensor().await {
            Ok(reply) => {
                if let Some(text) = reply.render() {
                    self.set_sensor_text(text);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "sensor request failed");
                self.set_sensor_text(COMM_ERROR_TEXT);
            }
        }
    }

    pub fn is_dark(&self) -> bool {
        self.page().body_classes.contains(DARK_MODE_CLASS)
    }

    pub fn sensor_text(&self) -> String {
        self.page().sensor_text.clone()
    }

    /// snapshot of the page
    pub fn snapshot(&self) -> Page {
        self.page().clone()
    }

    fn set_sensor_text(&self, text: impl Into<String>) {
        self.page().sensor_text = text.into();
    }

    // a panicked click cannot leave the page half-written, so poisoning is ignored
    fn page(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SensorReply;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    enum Scripted {
        Reply(SensorReply),
        Status(u16),
        BadBody,
    }

    #[derive(Default)]
    struct FakeDevice {
        posts: Mutex<Vec<&'static str>>,
        replies: Mutex<VecDeque<(Duration, Scripted)>>,
    }

    impl FakeDevice {
        fn script(&self, delay_ms: u64, reply: Scripted) {
            self.replies
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), reply));
        }

        fn posts(&self) -> Vec<&'static str> {
            self.posts.lock().unwrap().clone()
        }
    }

    impl DeviceApi for FakeDevice {
        async fn send_command(&self, cmd: LedCommand) -> Result<(), ClientError> {
            self.posts.lock().unwrap().push(cmd.path());
            Ok(())
        }

        async fn fetch_sensor(&self) -> Result<SensorReply, ClientError> {
            self.posts.lock().unwrap().push("/gpio/sensor");
            let (delay, reply) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply");
            tokio::time::sleep(delay).await;
            match reply {
                Scripted::Reply(r) => Ok(r),
                Scripted::Status(status) => Err(ClientError::Status {
                    path: "/gpio/sensor",
                    status,
                }),
                Scripted::BadBody => Err(ClientError::Decode {
                    path: "/gpio/sensor",
                    source: serde_json::from_str::<SensorReply>("<html>").unwrap_err(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_mode_toggles_once_per_click() {
        let panel = ControlPanel::new(FakeDevice::default());
        assert!(!panel.is_dark());

        panel.click(Button::Mode).await.unwrap();
        assert!(panel.is_dark());
        assert!(panel.snapshot().body_classes.contains("darkMode"));

        panel.click(Button::Mode).await.unwrap();
        assert!(!panel.is_dark());
        assert!(panel.api().posts().is_empty());
    }

    #[tokio::test]
    async fn test_led_clicks_post_once() {
        let panel = ControlPanel::new(FakeDevice::default());

        panel.click(Button::LedOn).await.unwrap();
        assert_eq!(panel.api().posts(), vec!["/gpio/on"]);

        panel.click(Button::LedOff).await.unwrap();
        assert_eq!(panel.api().posts(), vec!["/gpio/on", "/gpio/off"]);
        assert_eq!(panel.sensor_text(), "");
    }

    #[tokio::test]
    async fn test_sensor_distance_rendered() {
        let panel = ControlPanel::new(FakeDevice::default());
        panel.api().script(0, Scripted::Reply(SensorReply::distance(42.0)));

        panel.click(Button::Sensor).await.unwrap();
        assert_eq!(panel.sensor_text(), "42 cm");
        assert_eq!(panel.api().posts(), vec!["/gpio/sensor"]);
    }

    #[tokio::test]
    async fn test_sensor_device_error_rendered() {
        let panel = ControlPanel::new(FakeDevice::default());
        panel.api().script(0, Scripted::Reply(SensorReply::failure("x")));

        panel.read_sensor().await;
        assert_eq!(panel.sensor_text(), "Chyba: x");
    }

    #[tokio::test]
    async fn test_sensor_http_500() {
        let panel = ControlPanel::new(FakeDevice::default());
        panel.api().script(0, Scripted::Status(500));

        panel.read_sensor().await;
        assert_eq!(panel.sensor_text(), "CHYBA komunikace!");
    }

    #[tokio::test]
    async fn test_sensor_bad_body() {
        let panel = ControlPanel::new(FakeDevice::default());
        panel.api().script(0, Scripted::BadBody);

        panel.read_sensor().await;
        assert_eq!(panel.sensor_text(), "CHYBA komunikace!");
    }

    #[tokio::test]
    async fn test_sensor_empty_reply_keeps_fetching_text() {
        let panel = ControlPanel::new(FakeDevice::default());
        panel.api().script(0, Scripted::Reply(SensorReply::default()));

        panel.read_sensor().await;
        assert_eq!(panel.sensor_text(), "Fetching data...");
    }

    #[tokio::test]
    async fn test_fetching_text_while_in_flight() {
        let panel = Arc::new(ControlPanel::new(FakeDevice::default()));
        panel.api().script(100, Scripted::Reply(SensorReply::distance(5.0)));

        let task = tokio::spawn({
            let panel = panel.clone();
            async move { panel.read_sensor().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(panel.sensor_text(), "Fetching data...");

        task.await.unwrap();
        assert_eq!(panel.sensor_text(), "5 cm");
    }

    #[tokio::test]
    async fn test_overlapping_reads_last_to_resolve_wins() {
        let panel = Arc::new(ControlPanel::new(FakeDevice::default()));
        // first click resolves last
        panel.api().script(150, Scripted::Reply(SensorReply::distance(1.0)));
        panel.api().script(10, Scripted::Reply(SensorReply::distance(2.0)));

        let first = tokio::spawn({
            let panel = panel.clone();
            async move { panel.read_sensor().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = tokio::spawn({
            let panel = panel.clone();
            async move { panel.read_sensor().await }
        });

        second.await.unwrap();
        assert_eq!(panel.sensor_text(), "2 cm");
        first.await.unwrap();
        assert_eq!(panel.sensor_text(), "1 cm");
        assert_eq!(panel.api().posts().len(), 2);
    }

    #[tokio::test]
    async fn test_sensor_distance_click_is_noop() {
        let panel = ControlPanel::new(FakeDevice::default());
        panel.click(Button::SensorDistance).await.unwrap();
        assert_eq!(panel.snapshot(), Page::default());
        assert!(panel.api().posts().is_empty());
    }
}
