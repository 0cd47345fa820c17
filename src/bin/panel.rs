//! ==============================================================================
//! panel.rs - interactive control panel
//! ==============================================================================
//!
//! purpose:
//!     the control page without a browser. every stdin line is a click:
//!
//!         modeButton | mode     toggle dark mode
//!         ledOn      | on       POST /gpio/on
//!         ledOff     | off      POST /gpio/off
//!         sensor               POST /gpio/sensor and show the reading
//!         show                 print the page
//!         quit                 exit
//!
//!     network clicks run as their own tasks, so a slow device never blocks
//!     the next click and overlapping requests resolve in any order. at the
//!     end of input the panel waits for every click still in flight.
//!
//! usage:
//!     panel [device-url]     (default: panel.device_url from panel.toml)
//!
//! ==============================================================================

use anyhow::Result;
use gpio_panel::client::HttpDevice;
use gpio_panel::domain::Button;
use gpio_panel::panel::ControlPanel;
use gpio_panel::{config, logging};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

enum Line {
    Click(Button),
    Show,
    Quit,
    Unknown,
}

fn parse_line(line: &str) -> Line {
    match line.trim() {
        "mode" => Line::Click(Button::Mode),
        "on" => Line::Click(Button::LedOn),
        "off" => Line::Click(Button::LedOff),
        "show" => Line::Show,
        "quit" | "exit" => Line::Quit,
        other => Button::from_id(other).map_or(Line::Unknown, Line::Click),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (mut config, events) = config::PanelConfig::load_or_default();
    if let Some(url) = std::env::args().nth(1) {
        config.panel.device_url = url;
    }
    logging::init(&config.logging.level);
    events.iter().for_each(config::ConfigEvent::log);

    let device = HttpDevice::new(&config.panel)?;
    tracing::info!(device = device.base_url(), "control panel ready");
    let panel = Arc::new(ControlPanel::new(device));

    run(panel, BufReader::new(tokio::io::stdin())).await
}

/// Feed every input line to the panel as a click.
///
/// returns once the input ends (or `quit`) and every click still in
/// flight has finished.
async fn run<R>(panel: Arc<ControlPanel<HttpDevice>>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut clicks = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Line::Click(Button::Mode) => {
                panel.toggle_mode();
                println!("dark mode: {}", if panel.is_dark() { "on" } else { "off" });
            }
            Line::Click(Button::Sensor) => {
                let panel = panel.clone();
                clicks.spawn(async move {
                    panel.read_sensor().await;
                    println!("sensor-distance: {}", panel.sensor_text());
                });
            }
            Line::Click(button) => {
                let panel = panel.clone();
                clicks.spawn(async move {
                    // led clicks do not handle their own failures
                    if let Err(e) = panel.click(button).await {
                        tracing::error!(button = %button, error = %e, "unhandled click failure");
                    }
                });
            }
            Line::Show => {
                let page = panel.snapshot();
                let classes: Vec<&str> = page.body_classes.iter().map(String::as_str).collect();
                println!("body class: [{}]", classes.join(" "));
                println!("sensor-distance: {}", page.sensor_text);
            }
            Line::Quit => break,
            Line::Unknown => {
                let ids: Vec<&str> = Button::ALL.iter().map(|b| b.id()).collect();
                println!("unknown input {:?}; try one of: {}, show, quit", line.trim(), ids.join(", "));
            }
        }
    }

    if !clicks.is_empty() {
        tracing::debug!(pending = clicks.len(), "waiting for clicks in flight");
    }
    while let Some(done) = clicks.join_next().await {
        if let Err(e) = done {
            tracing::error!(error = %e, "click task failed");
        }
    }
    Ok(())
}
