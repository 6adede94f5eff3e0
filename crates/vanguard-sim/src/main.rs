//! # Vanguard Sim
//!
//! Headless entry point: loads `vanguard.toml` (or the path given as the
//! first argument), runs the scripted duel and logs the result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vanguard_sim::config::{SimConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("vanguard=info".parse()?))
        .init();

    info!("Vanguard sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = SimConfig::load_from(&config_path);

    let outcome = vanguard_sim::app::run(&config)?;
    info!(
        "Duel over after {:.2}s ({} ticks): {}",
        outcome.elapsed,
        outcome.ticks,
        outcome.summary()
    );

    info!("Vanguard sim shutdown complete");
    Ok(())
}
