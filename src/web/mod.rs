//! Web server and API endpoints for the smart surface exhibit.
//!
//! Measurement endpoints hand the blocking sensor work to tokio's blocking pool
//! and return the engine's reports as JSON. A WebSocket endpoint streams every
//! recorded measurement to connected dashboards.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{Result, SurfaceError};
use crate::sensors::SurfaceEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SurfaceEngine>,
    pub config: Arc<WebConfig>,
    /// One permit per live-feed client, held for the life of the connection.
    pub client_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(engine: Arc<SurfaceEngine>, config: WebConfig) -> Self {
        Self {
            client_slots: Arc::new(Semaphore::new(config.max_websocket_connections)),
            engine,
            config: Arc::new(config),
        }
    }
}

/// Start the web server with the provided configuration and engine.
pub async fn start_web_server(config: WebConfig, engine: Arc<SurfaceEngine>) -> Result<()> {
    config.validate()?;

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SurfaceError::config_error(format!("Invalid bind address: {}", e)))?;

    let app = create_app(config, engine).await?;

    info!("Starting smart surface server on http://{}", addr);
    info!("Dashboard available at http://{}/", addr);
    info!("Measurements: http://{}/measure_distance, /measure_shape, /measure_material", addr);
    info!("Live feed: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SurfaceError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| SurfaceError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
