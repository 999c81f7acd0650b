//! Tell Router - routes events to destinations by token
//!
//! # Usage
//!
//! ```bash
//! tell-router
//! tell-router --config configs/config.toml
//! tell-router --config /etc/tell/router.toml --log-level debug
//! ```

mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tell_config::{Config, LogConfig, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tell Router - routes events to hot-reloadable destinations
#[derive(Parser, Debug)]
#[command(name = "tell-router")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/config.toml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    init_logging(&config.log, cli.log_level.as_deref())?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "tell-router starting"
    );

    serve::run(config).await
}

/// Initialize the tracing subscriber for logging
///
/// `RUST_LOG` wins over the CLI override, which wins over `[log] level`.
fn init_logging(log: &LogConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(log.level.as_str());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
    }

    Ok(())
}
