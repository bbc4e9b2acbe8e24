//! Axum HTTP server for the operational API.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::{Config, WebConfig};
use crate::monitor::CycleStats;
use crate::steam::SteamClient;

use super::routes;

/// Shared state for all web routes.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub steam: Arc<SteamClient>,
    pub stats: Arc<CycleStats>,
    pub config: Arc<Config>,
}

/// Axum web server exposing the monitor's operations over JSON.
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(
        config: Arc<Config>,
        db: SqlitePool,
        steam: Arc<SteamClient>,
        stats: Arc<CycleStats>,
    ) -> Self {
        Self {
            config: config.web.clone(),
            state: AppState {
                db,
                steam,
                stats,
                config,
            },
        }
    }

    /// Start the HTTP server.
    pub async fn start(self) -> anyhow::Result<()> {
        let app = Router::new()
            .merge(routes::api_routes())
            .with_state(self.state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.port));
        info!(port = self.config.port, "web api starting");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
