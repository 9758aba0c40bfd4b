//! WebSocket live feed of recorded measurements.

use crate::sensors::LastMeasurement;
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::OwnedSemaphorePermit;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let slot = match reserve_slot(&state) {
        Ok(slot) => slot,
        Err(status) => return status.into_response(),
    };

    ws.on_upgrade(move |socket| handle_websocket(socket, state, slot))
}

/// Claim a live-feed slot, or `503` when all are taken.
pub fn reserve_slot(state: &AppState) -> Result<OwnedSemaphorePermit, StatusCode> {
    state.client_slots.clone().try_acquire_owned().map_err(|_| {
        warn!(
            "Rejecting WebSocket client: all {} slots in use",
            state.config.max_websocket_connections
        );
        StatusCode::SERVICE_UNAVAILABLE
    })
}

/// Handle a WebSocket connection. The slot is released when this returns.
async fn handle_websocket(socket: WebSocket, state: AppState, _slot: OwnedSemaphorePermit) {
    let client_id = uuid::Uuid::new_v4().to_string();
    info!("WebSocket client connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut updates = BroadcastStream::new(state.engine.subscribe());

    // Clients only listen; incoming frames are just drained until close
    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    info!("WebSocket client {} disconnected", client_id_recv);
                    break;
                }
                Ok(other) => debug!("Ignoring message from {}: {:?}", client_id_recv, other),
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", client_id_recv, e);
                    break;
                }
            }
        }
    });

    let client_id_send = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(update) = updates.next().await {
            let measurement = match update {
                Ok(measurement) => measurement,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged, skipped {} updates", client_id_send, skipped);
                    continue;
                }
            };
            match encode(&measurement) {
                Ok(text) => {
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        warn!("Failed to send message to client {}: {}", client_id_send, e);
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize measurement for {}: {}", client_id_send, e),
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => {
            debug!("Receive task completed for client {}", client_id);
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!("Send task completed for client {}", client_id);
            recv_task.abort();
        }
    }

    info!("WebSocket client disconnected: {}", client_id);
}

fn encode(measurement: &LastMeasurement) -> serde_json::Result<String> {
    serde_json::to_string(measurement)
}

/// Get the number of connected WebSocket clients.
pub fn connected_client_count(state: &AppState) -> usize {
    state
        .config
        .max_websocket_connections
        .saturating_sub(state.client_slots.available_permits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorConfig, SimulatedHardware, SurfaceEngine};
    use crate::web::WebConfig;
    use std::sync::Arc;

    fn state(max_clients: usize) -> AppState {
        let engine = SurfaceEngine::with_hardware(
            SensorConfig::simulated(),
            Box::new(SimulatedHardware::seeded(11)),
        );
        let config = WebConfig::default().with_max_websocket_connections(max_clients);
        AppState::new(Arc::new(engine), config)
    }

    #[tokio::test]
    async fn test_no_clients_connected() {
        let state = state(4);
        assert_eq!(connected_client_count(&state), 0);
    }

    #[tokio::test]
    async fn test_slots_are_capped_and_released() {
        let state = state(2);
        let first = reserve_slot(&state).unwrap();
        let _second = reserve_slot(&state).unwrap();
        assert_eq!(connected_client_count(&state), 2);
        assert_eq!(
            reserve_slot(&state).unwrap_err(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        drop(first);
        assert_eq!(connected_client_count(&state), 1);
        assert!(reserve_slot(&state).is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_reservations_respect_cap() {
        let state = state(3);
        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { reserve_slot(&state).ok() })
            })
            .collect();

        let mut held = Vec::new();
        for attempt in attempts {
            if let Some(slot) = attempt.await.unwrap() {
                held.push(slot);
            }
        }
        assert_eq!(held.len(), 3);
        assert_eq!(connected_client_count(&state), 3);
    }

    #[tokio::test]
    async fn test_measurement_encoding() {
        let state = state(1);
        let report = state.engine.measure_shape(3);
        let text = encode(&LastMeasurement::Shape(report)).unwrap();
        assert!(text.contains("\"kind\":\"shape\""));
    }
}
