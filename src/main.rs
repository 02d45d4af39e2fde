//! Safety Dashboard - client for a PPE detection service
//!
//! Submits images and videos for helmet and vest detection, follows the
//! live detection stream, and reports results on the console.

mod app;
mod busy;
mod client;
mod config;
mod console;
mod dashboard;
mod error;
mod notifications;
mod pipeline;
mod shared;
mod storage;
mod stream;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::SafetyDashboardApp;
use crate::client::HttpDetectionClient;
use crate::config::AppConfig;
use crate::shared::SessionConfig;

/// Safety Dashboard - PPE detection client
#[derive(Parser, Debug)]
#[command(name = "safety-dashboard")]
#[command(about = "Console dashboard for a helmet and vest detection service")]
struct Args {
    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection service API root, overriding the configuration
    #[arg(short, long)]
    server: Option<String>,

    /// Initial confidence threshold (0.0 - 1.0)
    #[arg(long)]
    confidence: Option<f32>,

    /// Directory to save annotated images in
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Safety Dashboard starting...");

    // Load or create configuration, then apply overrides
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_or_create_config(),
    };
    if let Some(server) = args.server {
        config.service.base_url = server;
    }
    if let Some(confidence) = args.confidence {
        config.detection.default_confidence = confidence;
    }
    if let Some(dir) = args.output_dir {
        config.output.save_dir = Some(dir);
    }
    config.validate()?;

    let service = Arc::new(HttpDetectionClient::new(&config.service.base_url)?);
    info!("Detection service at {}", service.base_url());

    let session = SessionConfig::with_confidence(config.detection.default_confidence);
    let mut app = SafetyDashboardApp::new(session, &config, service);
    app.start_renderer(config.output.save_dir.clone());
    app.start_input();

    app.wait().await?;
    drop(app);

    info!("Safety Dashboard shutdown complete");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => warn!("Ignoring {:?}: {}", config_path, e),
            }
        } else {
            write_default_config(&config_path);
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

fn write_default_config(path: &Path) {
    match config::save_config(&AppConfig::default(), path) {
        Ok(()) => info!("Wrote default configuration to {:?}", path),
        Err(e) => warn!("Could not write default configuration: {}", e),
    }
}
