//! Launcher for the stry server: config, logging, then a blocking start().

use stry::config::Config;
use stry::server::Service;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        listeners = config.listeners,
        workers = config.workers,
        "Starting stry server"
    );

    let service = Service::bind(&config)?;
    service.start()?;

    Ok(())
}
