//! Listing Price Service - Main Entry Point

use anyhow::Context;
use api::{init_logging, install_metrics, run_server, AppState, Settings};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_logging(&settings.logging)?;

    info!("=== Listing Price Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Loading artifacts from {}", settings.artifacts.dir.display());

    // Nothing is served unless every artifact loads
    let context = artifacts::load_context(&settings.artifacts).context("failed to load artifacts")?;
    let metrics = install_metrics().context("failed to install metrics exporter")?;

    let state = Arc::new(AppState::new(context, Some(metrics)));
    run_server(state, &settings.server.addr).await?;

    Ok(())
}
