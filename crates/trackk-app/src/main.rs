//! Trackk headless dashboard client - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

/// Trackk headless dashboard client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TRACKK_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Start from this layout preset, replacing the saved widgets
    #[arg(short, long)]
    preset: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS provider must be installed before any wss:// connection
    trackk_ws::init_crypto();

    let args = Args::parse();

    trackk_telemetry::init_logging()?;

    info!("Starting Trackk v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > TRACKK_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("TRACKK_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = trackk_app::AppConfig::from_file(&config_path)?;
    info!(
        url = %config.ws.connection.url,
        workspace = %config.workspace_path.display(),
        "Configuration loaded"
    );

    let mut app = trackk_app::Application::new(config)?;

    if let Err(e) = app.init(args.preset.as_deref()).await {
        error!(error = %e, "Startup failed");
        app.shutdown().await?;
        return Err(e.into());
    }

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}
