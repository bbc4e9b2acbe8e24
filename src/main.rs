//! Steam Price Bot — Entry Point
//!
//! Loads configuration, initializes all subsystems, and runs the monitor loops.
//! Handles graceful shutdown on SIGINT/SIGTERM.

mod config;
mod db;
mod engine;
mod error;
mod logging;
mod monitor;
mod notify;
mod promotions;
mod steam;
mod web;

use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::pool;
use crate::engine::PriceEngine;
use crate::notify::{NotifySink, TelegramNotifier};
use crate::steam::{PriceFetcher, SteamClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if missing)
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Arc::new(Config::load()?);

    // Initialize logging
    logging::structured::init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        region = %config.steam.default_region,
        poll_interval_secs = config.monitor.poll_interval_secs,
        "steam-price-bot starting"
    );

    // Initialize database
    let db_pool = pool::create_pool(&config.database.url).await?;
    pool::run_migrations(&db_pool).await?;
    info!("database connected and migrations applied");

    // Initialize the storefront client
    let steam = Arc::new(SteamClient::new(&config.steam)?);

    // Initialize the price event engine
    let price_engine = Arc::new(PriceEngine::new(db_pool.clone()));

    // Initialize the notification sink
    let notifier: Arc<dyn NotifySink> = Arc::new(TelegramNotifier::new(&config.telegram)?);

    // Shared monitor statistics, read by the web API
    let stats = Arc::new(monitor::CycleStats::new());

    // Shutdown flag watched by both monitor loops
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn the price poll loop
    let fetcher: Arc<dyn PriceFetcher> = steam.clone();
    let price_handle = tokio::spawn(monitor::run_price_loop(
        config.clone(),
        db_pool.clone(),
        fetcher,
        price_engine.clone(),
        notifier.clone(),
        stats.clone(),
        shutdown_rx.clone(),
    ));

    // Spawn the seasonal sale announcement loop
    let promo_handle = tokio::spawn(monitor::run_promotion_loop(
        config.clone(),
        db_pool.clone(),
        notifier.clone(),
        stats.clone(),
        shutdown_rx,
    ));

    // Spawn web API (if enabled)
    let _web_handle = if config.web.enabled {
        let web_server = web::server::WebServer::new(
            config.clone(),
            db_pool.clone(),
            steam.clone(),
            stats.clone(),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.start().await {
                error!(error = %e, "web server error");
            }
        }))
    } else {
        None
    };

    info!("all subsystems started, waiting for shutdown signal");

    // Wait for shutdown signal
    let shutdown = async {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => { info!("received SIGINT"); }
            _ = sigterm.recv() => { info!("received SIGTERM"); }
        }
    };

    shutdown.await;

    // Graceful shutdown — an in-flight cycle is allowed to finish
    warn!("shutting down — stopping monitor loops");
    let _ = shutdown_tx.send(true);
    let _ = price_handle.await;
    let _ = promo_handle.await;

    info!("shutdown complete");
    Ok(())
}
