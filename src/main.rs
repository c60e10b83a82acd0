use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use statwatch::{App, Settings};

/// Settings file used when `STATWATCH_CONFIG` is not set.
const DEFAULT_CONFIG: &str = "statwatch.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = match std::env::var_os("STATWATCH_CONFIG") {
        Some(path) => Some(PathBuf::from(path)),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
    };
    match &config_path {
        Some(path) => info!("Loading settings from {}", path.display()),
        None => info!("No settings file, using defaults and environment"),
    }

    let settings = Settings::load(config_path.as_deref())?;
    let app = App::new(settings)?;

    app.run(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
