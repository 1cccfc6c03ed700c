mod analysis;
mod api;
mod config;
mod data;
mod error;
mod forecasting;
mod monitoring;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{Config, EnvConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load_or_default(&args.config)?;
    let env_config = EnvConfig::load()?;
    config.apply_env(&env_config);

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.monitoring.log_level))
        .with_context(|| format!("Invalid log level: {}", config.monitoring.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Data Flow Analyzer v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::info!("Config: {}", args.config.display());
    tracing::info!("Decimal places: {}", config.analysis.decimal_places);
    tracing::info!(
        "Forecast limits: max_order={} max_steps={} max_iterations={}",
        config.forecast.max_order,
        config.forecast.max_steps,
        config.forecast.max_iterations
    );
    tracing::info!(
        "Metrics endpoint: {}",
        cfg!(feature = "metrics") && config.monitoring.metrics_enabled
    );

    let addr = config.bind_addr()?;
    let ctx = api::AppContext::new(&config).context("Failed to initialize application state")?;
    let routes = api::routes(ctx, &config);

    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", bound);
    server.await;

    tracing::info!("Shutting down...");
    Ok(())
}
