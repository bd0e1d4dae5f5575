//! Driving Telemetry - Main Entry Point
//!
//! Usage: `drive-telemetry [config.toml]`

use std::path::PathBuf;

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== Drive Telemetry v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Storage: {}, cloud sync: {}",
        config.storage.url,
        if config.cloud.enabled { "enabled" } else { "disabled" }
    );

    run_server(config).await?;

    Ok(())
}
