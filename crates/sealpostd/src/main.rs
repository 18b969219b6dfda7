//! sealpostd: sealpost blob listener daemon
//!
//! Usage:
//!   sealpostd [--config /etc/sealpost/config.toml] [--listen 0.0.0.0:8084]

mod daemon;
mod metrics;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use sealpost_core::config::SealpostConfig;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sealpostd", version, about = "sealpost blob listener daemon")]
struct Cli {
    /// Path to sealpost.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SEALPOST_CONFIG",
        default_value = "/etc/sealpost/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SEALPOST_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "SEALPOST_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Listen address; overrides the config file
    #[arg(long, short = 'l')]
    listen: Option<String>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_config(value: &str) -> Self {
        match value {
            "text" => Self::Text,
            _ => Self::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings may come from the file, so it is read before the
    // subscriber exists; anything worth reporting is logged afterwards.
    let (config, found) = load_config(&cli)?;

    let level = cli.log.clone().unwrap_or_else(|| config.daemon.log_level.clone());
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| LogFormat::from_config(&config.daemon.log_format));
    init_logging(&level, &format);
    report_config(&cli.config, found);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        listen = %config.daemon.listen,
        "sealpostd starting"
    );

    daemon::run(config).await
}

/// Read the config file (if any) and apply command-line overrides.
/// The flag is `false` when the file was missing and defaults are in use.
fn load_config(cli: &Cli) -> Result<(SealpostConfig, bool)> {
    let loaded = SealpostConfig::load(&cli.config)?;
    let found = loaded.is_some();

    let mut config = loaded.unwrap_or_default();
    if let Some(listen) = &cli.listen {
        config.daemon.listen = listen.clone();
    }
    Ok((config, found))
}

fn report_config(path: &Path, found: bool) {
    if !found {
        sealpost_core::config::warn_defaults(path);
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
