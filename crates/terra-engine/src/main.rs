//! # Terra
//!
//! Headless driver for the terrain streamer.
//!
//! Flies an observer across procedurally generated terrain, streaming
//! chunks around it on a background worker pool, and logs what happened.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod timing;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("terra=info".parse()?))
        .init();

    info!("Terra starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load();
    config.validate();

    let summary = app::run(&config)?;
    info!("{summary}");

    info!("Terra shutdown complete");
    Ok(())
}
