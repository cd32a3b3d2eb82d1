use anyhow::{Context, Result};
use harvest::{HarvestConfig, Harvester, logging};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = HarvestConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config).context("Failed to initialise logging")?;

    info!(
        images_dir = %config.images_dir.display(),
        metadata_dir = %config.metadata_dir.display(),
        cursor_file = %config.cursor_file.display(),
        "Harvest configured"
    );

    let harvester = Harvester::new(config).context("Failed to build harvester")?;
    let summary = harvester
        .run_until(shutdown_signal())
        .await
        .context("Harvest could not start")?;

    info!(
        saved = summary.saved,
        already_present = summary.already_present,
        rejected = summary.rejected,
        failed = summary.failed,
        interrupted = summary.interrupted,
        "All done"
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c, running until the index bound: {}", e);
        std::future::pending::<()>().await;
    }
}
