//! ==============================================================================
//! main.rs - device host entry point
//! ==============================================================================
//!
//! purpose:
//!     the application that owns the hardware. it serves the control page
//!     (index.html, styling.css, index.js) and the gpio endpoints the page
//!     posts to.
//!
//! responsibilities:
//!     - load configuration and set up logging
//!     - pick the hal backend (mock, or rppal with feature="hardware")
//!     - put the led pin into output mode
//!     - serve the web router until ctrl-c
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────┐
//!     │            rust host (this file)              │
//!     │  ┌────────────────┐     ┌──────────────────┐  │
//!     │  │  web server    │────>│       hal        │  │
//!     │  │  (device.rs)   │     │  (mock / rppal)  │  │
//!     │  └───────┬────────┘     └────────┬─────────┘  │
//!     └──────────┼───────────────────────┼────────────┘
//!                │ http                  │ gpio
//!         ┌──────┴──────┐      ┌─────────┴─────────┐
//!         │ panel (web  │      │ led pin, hc-sr04  │
//!         │  or cli)    │      │ trigger / echo    │
//!         └─────────────┘      └───────────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use gpio_panel::{config, device, hal, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (config, events) = config::PanelConfig::load_or_default();
    logging::init(&config.logging.level);
    events.iter().for_each(config::ConfigEvent::log);
    config.log_summary();

    // step 2: hardware
    let hal = hal::build(&config).context("failed to initialise hardware")?;
    device::init_gpio(hal.as_ref(), &config)?;

    // step 3: web server
    let bind = config.server.bind.clone();
    let app = device::router(device::DeviceState::new(hal, config));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!(address = %bind, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
