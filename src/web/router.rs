//! Web application router and middleware setup.

use crate::error::Result;
use crate::sensors::SurfaceEngine;
use crate::web::config::WebConfig;
use crate::web::{handlers, websocket, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the main axum application with all routes and middleware.
pub async fn create_app(config: WebConfig, engine: Arc<SurfaceEngine>) -> Result<Router> {
    let state = AppState::new(engine, config.clone());

    let mut app = Router::new()
        // Measurement routes
        .route("/status", get(handlers::get_status))
        .route("/measure_distance", get(handlers::measure_distance))
        .route("/measure_shape", get(handlers::measure_shape))
        .route("/measure_material", get(handlers::measure_material))
        .route("/buzzer", post(handlers::buzzer))
        // API routes
        .route("/api/last", get(handlers::last_measurement))
        .route("/api/health", get(handlers::health_check))
        // WebSocket route
        .route("/ws", get(websocket::websocket_handler));

    let static_dir = config
        .static_path
        .as_ref()
        .map(PathBuf::from)
        .filter(|dir| {
            let exists = dir.exists();
            if !exists {
                warn!("Static path {:?} does not exist, serving default index", dir);
            }
            exists
        });

    let has_index = config.index_path().map_or(false, |p| p.exists());
    app = if static_dir.is_some() && has_index {
        app.route("/", get(handlers::serve_index))
    } else {
        app.route("/", get(handlers::default_index))
    };

    let mut app: Router = app.with_state(state);

    if let Some(dir) = static_dir {
        info!("Serving static files from: {:?}", dir);
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorConfig, SimulatedHardware};

    #[tokio::test]
    async fn test_create_app() {
        let engine = Arc::new(SurfaceEngine::with_hardware(
            SensorConfig::simulated(),
            Box::new(SimulatedHardware::new()),
        ));
        let config = WebConfig::default().with_static_path(Some("does/not/exist".into()));
        let app = create_app(config, engine).await;
        assert!(app.is_ok());
    }
}
