//! HTTP handlers for the measurement and API endpoints.

use crate::sensors::{DistanceReport, LastMeasurement, MaterialReport, ShapeReport, StatusReport};
use crate::web::{websocket, AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

/// Optional `?samples=N` override for measurement endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SampleQuery {
    pub samples: Option<usize>,
}

/// Optional body of `POST /buzzer`.
#[derive(Debug, Default, Deserialize)]
pub struct BuzzerRequest {
    pub beeps: Option<u32>,
}

/// Run blocking sensor work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!("Sensor task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Component availability, temperatures, button state and last result.
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusReport>, StatusCode> {
    let engine = state.engine.clone();
    run_blocking(move || engine.status()).await.map(Json)
}

/// Averaged distance with temperature-corrected speed of sound.
pub async fn measure_distance(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Result<Json<DistanceReport>, StatusCode> {
    let engine = state.engine.clone();
    let samples = query.samples.unwrap_or(engine.config().distance_samples);
    run_blocking(move || engine.measure_distance(samples))
        .await
        .map(Json)
}

/// Flat / curved / irregular classification.
pub async fn measure_shape(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Result<Json<ShapeReport>, StatusCode> {
    let engine = state.engine.clone();
    let samples = query.samples.unwrap_or(engine.config().classification_samples);
    run_blocking(move || engine.measure_shape(samples))
        .await
        .map(Json)
}

/// Absorption classification plus surface color.
pub async fn measure_material(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Result<Json<MaterialReport>, StatusCode> {
    let engine = state.engine.clone();
    let samples = query.samples.unwrap_or(engine.config().classification_samples);
    run_blocking(move || engine.measure_material(samples))
        .await
        .map(Json)
}

/// Fire-and-forget buzzer feedback; responds before the beeps finish.
pub async fn buzzer(
    State(state): State<AppState>,
    body: Option<Json<BuzzerRequest>>,
) -> Json<serde_json::Value> {
    let beeps = crate::sensors::config::clamp_beeps(
        body.and_then(|Json(req)| req.beeps).unwrap_or(1),
    );
    let engine = state.engine.clone();

    tokio::task::spawn_blocking(move || {
        let emitted = engine.trigger_feedback(beeps);
        debug!("Buzzer emitted {}/{} beeps", emitted, beeps);
    });

    Json(json!({ "status": "ok", "beeps": beeps }))
}

/// Most recent measurement of any kind.
pub async fn last_measurement(
    State(state): State<AppState>,
) -> Result<Json<LastMeasurement>, StatusCode> {
    state
        .engine
        .last_measurement()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "smart-surface",
        "version": env!("CARGO_PKG_VERSION"),
        "simulation": state.engine.is_simulated(),
        "websocket_clients": websocket::connected_client_count(&state),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Serve the dashboard page from the configured static directory.
pub async fn serve_index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let path = state.config.index_path().ok_or(StatusCode::NOT_FOUND)?;
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(Html(content)),
        Err(e) => {
            error!("Failed to read {:?}: {}", path, e);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Serve the built-in dashboard page.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

/// Built-in dashboard used when no static `index.html` is provided.
const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Smart Surface Dashboard</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #1d2333;
            color: #eef;
            max-width: 720px;
            margin: 0 auto;
            padding: 20px;
        }
        h1 { text-align: center; }
        .actions { display: flex; gap: 10px; flex-wrap: wrap; margin-bottom: 20px; }
        button {
            flex: 1;
            padding: 12px;
            border: none;
            border-radius: 8px;
            background: #4f6df5;
            color: white;
            font-size: 1rem;
            cursor: pointer;
        }
        .card { background: #2a3148; border-radius: 12px; padding: 20px; margin-bottom: 16px; }
        .spark { font-size: 1.6rem; letter-spacing: 2px; }
        pre { white-space: pre-wrap; font-size: 0.85rem; }
    </style>
</head>
<body>
    <h1>Smart Surface Dashboard</h1>
    <div class="actions">
        <button onclick="measure('/measure_distance')">Distance</button>
        <button onclick="measure('/measure_shape')">Shape</button>
        <button onclick="measure('/measure_material')">Material</button>
        <button onclick="beep()">Beep</button>
    </div>
    <div class="card">
        <h3 id="headline">No measurement yet</h3>
        <div class="spark" id="spark"></div>
    </div>
    <div class="card"><pre id="raw">Loading status...</pre></div>
    <script>
        const levels = '▁▂▃▄▅▆▇█';

        function sparkline(samples) {
            const values = samples.filter(v => v !== null);
            const min = Math.min(...values), max = Math.max(...values);
            return samples.map(v => {
                if (v === null) return '·';
                if (max - min < 1e-9) return levels[0];
                return levels[Math.round((v - min) / (max - min) * 7)];
            }).join('');
        }

        function show(data) {
            const label = data.label || data.absorption || '';
            const mean = data.mean_cm !== undefined ? `${data.mean_cm.toFixed(2)} cm` : '';
            document.getElementById('headline').textContent =
                `${label} ${mean} (σ ${data.stddev_cm.toFixed(2)}, ${data.source})`;
            document.getElementById('spark').textContent = sparkline(data.samples);
            document.getElementById('raw').textContent = JSON.stringify(data, null, 2);
        }

        function measure(path) {
            document.getElementById('headline').textContent = 'Measuring...';
            fetch(path).then(r => r.json()).then(show)
                .catch(e => console.error('Measurement failed:', e));
        }

        function beep() {
            fetch('/buzzer', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ beeps: 1 })
            });
        }

        const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
        const ws = new WebSocket(`${protocol}//${window.location.host}/ws`);
        ws.onmessage = event => show(JSON.parse(event.data));

        fetch('/status').then(r => r.json()).then(status => {
            document.getElementById('raw').textContent = JSON.stringify(status, null, 2);
        });
    </script>
</body>
</html>"#;
