//! Command-line interface for the collector.
//!
//! `cwcollect --config metrics.yaml --snapshot snapshot.json` runs one
//! collection and prints every event as a JSON line on stdout.

use crate::api::{MetricsApi, SnapshotApi};
use crate::application::Application;
use crate::core::config::ConfigBuilder;
use crate::core::{CollectorError, Config, LogLevel, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Collect CloudWatch metrics into per-resource events
#[derive(Parser, Debug)]
#[command(name = "cwcollect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/cwcollect/config.yaml)
    #[arg(short, long, env = "CWCOLLECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot file answering metric and tag requests
    #[arg(long, env = "CWCOLLECT_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Regions to collect from, comma separated
    #[arg(long, env = "CWCOLLECT_REGIONS", value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Query period, e.g. `5m`
    #[arg(long, env = "CWCOLLECT_PERIOD", value_parser = parse_duration)]
    pub period: Option<Duration>,

    /// End of the collection window as RFC 3339 (default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Write events to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "CWCOLLECT_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("cwcollect").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/cwcollect/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                return self.build_config_from_args(builder);
            }
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
                tracing::info!("Loaded configuration from: {:?}", config_path);
            },
            Err(e) if self.config.is_some() => {
                return Err(CollectorError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {
                tracing::debug!("No config file found at {:?}, using defaults", config_path);
            },
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if !self.regions.is_empty() {
            builder = builder.regions(self.regions.iter().cloned());
        }
        if let Some(period) = self.period {
            builder = builder.period(period);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging. Logs go to stderr; stdout carries events.
    ///
    /// `RUST_LOG` wins, then `CWCOLLECT_LOG_LEVEL`, then the configured level.
    pub fn init_logging(&self, configured: LogLevel) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level = std::env::var("CWCOLLECT_LOG_LEVEL")
            .unwrap_or_else(|_| configured.as_str().to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| CollectorError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute one collection run.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(config.logging.level)?;
    tracing::debug!(
        regions = ?config.regions,
        entries = config.metrics.len(),
        "Configuration loaded"
    );

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Regions: {}", config.regions.join(", "));
        println!("  Period: {}s", config.period.as_secs());
        println!("  Metric entries: {}", config.metrics.len());
        return Ok(());
    }

    let Some(snapshot_path) = &cli.snapshot else {
        return Err(CollectorError::config(
            "no metrics API available: pass --snapshot <FILE>",
        ));
    };
    let api = Arc::new(SnapshotApi::from_file(snapshot_path).await?);
    let app = Application::new(config, Arc::clone(&api) as Arc<dyn MetricsApi>, api)?;
    let now = cli.at.unwrap_or_else(Utc::now);

    let published = match &cli.output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            app.run_at(now, BufWriter::new(file)).await?
        },
        None => {
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let published = app.run_at(now, &mut out).await?;
            out.flush()?;
            published
        },
    };

    tracing::debug!(published, "Done");
    Ok(())
}
