use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use smart_surface::web::create_app;
use smart_surface::{SensorConfig, SimulatedHardware, SurfaceEngine, WebConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

fn engine() -> Arc<SurfaceEngine> {
    let mut config = SensorConfig::simulated();
    config.beep_on_ms = 1;
    config.beep_gap_ms = 1;
    Arc::new(SurfaceEngine::with_hardware(
        config,
        Box::new(SimulatedHardware::seeded(9)),
    ))
}

async fn app() -> Router {
    create_app(WebConfig::default(), engine())
        .await
        .expect("Should build router")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;
    let (status, body) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "smart-surface");
    assert_eq!(body["simulation"], true);
    assert_eq!(body["websocket_clients"], 0);
}

#[tokio::test]
async fn test_measure_shape_with_sample_override() {
    let app = app().await;
    let (status, body) = send(&app, get("/measure_shape?samples=3")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["samples"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["source"], "simulated");
    let label = body["label"].as_str().unwrap();
    assert!(["Flat", "Curved", "Irregular"].contains(&label));
    assert!(body["accuracy"].as_f64().unwrap() >= 80.0);
}

#[tokio::test]
async fn test_measure_distance_defaults_to_five_samples() {
    let app = app().await;
    let (status, body) = send(&app, get("/measure_distance")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["samples"].as_array().map(Vec::len), Some(5));
    let speed = body["speed_m_s"].as_f64().unwrap();
    assert!((343.0..=349.0).contains(&speed));
}

#[tokio::test]
async fn test_oversized_sample_request_is_clamped() {
    let app = app().await;
    let (status, body) = send(&app, get("/measure_material?samples=500")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["samples"].as_array().map(Vec::len), Some(50));
    assert!(body["rgb"]["r"].is_u64());
}

#[tokio::test]
async fn test_last_measurement_follows_requests() {
    let app = app().await;

    let (status, _) = send(&app, get("/api/last")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, get("/measure_shape?samples=4")).await;
    let (status, body) = send(&app, get("/api/last")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "shape");
    assert_eq!(body["samples"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_buzzer_clamps_and_defaults() {
    let app = app().await;

    let (status, body) = send(&app, post_json("/buzzer", r#"{"beeps": 20}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["beeps"], 10);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/buzzer")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["beeps"], 1);
}

#[tokio::test]
async fn test_status_reports_components() {
    let app = app().await;
    let (status, body) = send(&app, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["simulation"], true);
    assert_eq!(body["ultrasonic"], true);
    assert_eq!(body["oled"], true);
    assert_eq!(body["button_pressed"], false);
    assert!(body["last_measurement"].is_null());
    let ambient = body["ambient_temp"].as_f64().unwrap();
    assert!((20.0..=30.0).contains(&ambient));
}

#[tokio::test]
async fn test_default_dashboard_is_served() {
    let app = app().await;
    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("Smart Surface Dashboard"));
}

async fn spawn_server(config: WebConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(config, engine()).await.unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

/// Send a WebSocket handshake and return the open stream with its status line.
async fn upgrade(addr: SocketAddr) -> (TcpStream, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /ws HTTP/1.1\r\nHost: {}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut buf = [0u8; 512];
    while !head.windows(2).any(|w| w == b"\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    let text = String::from_utf8_lossy(&head);
    let status_line = text.lines().next().unwrap_or_default().to_string();
    (stream, status_line)
}

#[tokio::test]
async fn test_websocket_slots_are_capped() {
    let addr = spawn_server(WebConfig::default().with_max_websocket_connections(1)).await;

    let (first, status) = upgrade(addr).await;
    assert!(status.contains("101"), "unexpected status: {}", status);

    let (_, status) = upgrade(addr).await;
    assert!(status.contains("503"), "unexpected status: {}", status);

    // Closing the first client frees its slot
    drop(first);
    let mut reopened = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (_stream, status) = upgrade(addr).await;
        if status.contains("101") {
            reopened = true;
            break;
        }
    }
    assert!(reopened, "slot was never released");
}
