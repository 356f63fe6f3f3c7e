//! pabx-exporter - Prometheus exporter for a PABX telephony server
//!
//! Polls the server's management API and serves call and system gauges
//! on `/metrics`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pabx_exporter::{
    config::ConfigManager, metrics::MetricsServer, PollingEngine, PrometheusSink,
    ShutdownCoordinator,
};

/// How long tasks get to stop after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// CLI arguments for pabx-exporter
#[derive(Parser, Debug)]
#[command(name = "pabx-exporter")]
#[command(about = "Prometheus exporter for PABX active calls and system status")]
#[command(version)]
#[command(long_about = "
Prometheus exporter for PABX active calls and system status

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  PABX_URL                - PABX base URL (e.g., https://pbx.example.com)
  PABX_USERNAME           - API username (legacy name: PABX_RAMALID)
  PABX_PASSWORD           - API password (legacy name: PABX_RAMALPASS)
  PABX_TRUNKID_LENGTH     - Digits in a trunk extension id (default 5)
  PABX_FAST_INTERVAL      - Active-call poll interval (e.g., 5s)
  PABX_SLOW_INTERVAL      - System-status poll interval (e.g., 30s)
  PABX_RENEWAL_INTERVAL   - Token renewal interval (e.g., 59m)
  PABX_RESTART_BACKOFF    - Wait before restarting after a failure (e.g., 1m)
  PORT                    - Metrics port (default 3000)
  PROM_PREFIX             - Metric name prefix (default pabx)
  PABX_LOG_LEVEL          - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// PABX base URL (overrides config file and environment)
    #[arg(short, long, help = "PABX base URL")]
    pub base_url: Option<String>,

    /// Metrics port (overrides config file and environment)
    #[arg(short, long, help = "Port to serve metrics on")]
    pub port: Option<u16>,

    /// Digits in a trunk extension id
    #[arg(long, help = "Digits in a trunk extension id")]
    pub trunk_id_length: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > environment > config file > defaults
    let config_found = args.config.exists();
    let mut config = if config_found {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.base_url.as_deref(),
        args.port,
        args.trunk_id_length,
        args.log_level.as_deref(),
    );

    init_tracing(&args, &config.monitoring.log_level)?;

    info!("Starting pabx-exporter v{}", env!("CARGO_PKG_VERSION"));
    if !config_found {
        info!(path = %args.config.display(), "Config file not found, using environment variables");
    }

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  PABX URL: {}", config.pabx.base_url);
        info!("  Username: {}", config.pabx.username);
        info!("  Trunk id length: {}", config.pabx.trunk_id_length);
        info!("  Fast interval: {:?}", config.polling.fast_interval);
        info!("  Slow interval: {:?}", config.polling.slow_interval);
        info!("  Renewal interval: {:?}", config.polling.renewal_interval);
        info!("  Restart backoff: {:?}", config.polling.restart_backoff);
        info!("  Metrics address: {}", config.metrics_addr());
        info!("  Metric prefix: {:?}", config.monitoring.metric_prefix);
        return Ok(());
    }

    info!("Configuration loaded successfully");
    info!("PABX URL: {}", config.pabx.base_url);
    info!("Metrics address: {}", config.metrics_addr());

    let shutdown_coordinator = ShutdownCoordinator::new(SHUTDOWN_TIMEOUT);

    let mut sink = PrometheusSink::new(&config.monitoring.metric_prefix)?;
    if config.monitoring.process_metrics {
        sink = sink.with_process_metrics()?;
    }
    let sink = Arc::new(sink);

    let metrics_server = MetricsServer::new(sink.clone(), config.metrics_addr());
    let metrics_shutdown = shutdown_coordinator.subscribe();
    let metrics_handle = tokio::spawn(async move {
        if let Err(e) = metrics_server.start(metrics_shutdown).await {
            error!("Metrics server error: {:#}", e);
        }
    });

    let engine = PollingEngine::new(&config, sink)?;
    let mut engine_handle = tokio::spawn(engine.run(shutdown_coordinator.subscribe()));

    info!("pabx-exporter started, press Ctrl+C or send SIGTERM/SIGINT to stop");

    tokio::select! {
        result = shutdown_coordinator.wait_for_signal() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
            }
        }
        joined = &mut engine_handle => {
            // The engine only returns on its own when the first login fails
            shutdown_coordinator.trigger();
            shutdown_coordinator
                .wait_for_tasks(vec![("metrics_server", metrics_handle)])
                .await;

            return match joined.context("Polling engine task failed")? {
                Ok(()) => Ok(()),
                Err(e) => Err(anyhow::Error::new(e).context("Could not obtain initial token")),
            };
        }
    }

    info!("Initiating graceful shutdown...");
    shutdown_coordinator.trigger();

    let engine_task = tokio::spawn(async move {
        match engine_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Polling engine stopped with error: {}", e),
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!("Polling engine task failed: {}", e),
        }
    });

    shutdown_coordinator
        .wait_for_tasks(vec![
            ("polling_engine", engine_task),
            ("metrics_server", metrics_handle),
        ])
        .await;

    info!("Shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, log_level: &str) -> Result<()> {
    let log_level = if args.verbose { "debug" } else { log_level };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
