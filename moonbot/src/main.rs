use anyhow::Context;
use clap::Parser;
use moonbot::{open_camera, AppState, Cli, HostTelemetry, MoonbotServer};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    moonbot::init_logging(&cli.log_level)?;

    let config = cli.app_config().context("invalid configuration")?;
    info!(
        bind = %config.bind_addr,
        photo_dir = %config.photo_dir.display(),
        camera = config.camera.index,
        "Starting MoonBot"
    );

    let device = open_camera(&config.camera, config.settings.photo_resolution);
    let state = AppState::new(config, device, Arc::new(HostTelemetry::new()))
        .await
        .context("failed to initialise MoonBot")?;

    MoonbotServer::new(state).run(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C; stop the process another way");
        std::future::pending::<()>().await;
    }
}
