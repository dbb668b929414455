use anyhow::{Context, Result};
use nomos_prices::clock::{Clock, SystemClock};
use nomos_prices::logging::init_logging;
use nomos_prices::{Config, PriceAggregator, PriceClient, PriceCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    config.validate().context("Invalid configuration")?;
    let tz = config.tz()?;

    info!(
        "nomos-prices {} starting up (zone {}, api {})",
        env!("APP_VERSION"),
        tz,
        config.api.base_url
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = PriceClient::from_config(&config, clock.clone())?;
    let aggregator = PriceAggregator::new(client, tz, clock.clone());
    let coordinator = PriceCoordinator::new(aggregator, config.refresh_interval(), clock);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    #[cfg(feature = "web")]
    let web_task = {
        let state = nomos_prices::web::AppState::new(coordinator.subscribe());
        let host = config.web.host.clone();
        let port = config.web.port;
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = nomos_prices::web::serve(state, &host, port, shutdown).await {
                error!("Web server error: {}", e);
            }
        })
    };

    let signal_task = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    coordinator.run(shutdown_rx).await;

    signal_task.abort();
    #[cfg(feature = "web")]
    if let Err(e) = web_task.await {
        error!("Web task ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}
