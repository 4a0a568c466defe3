// HTTP + WebSocket routes

use crate::models::{ProtocolSnapshot, RegistryResponse, SnapshotResponse};
use crate::registry::Registry;
use crate::version::{NAME, VERSION};
use crate::worker::LatestState;
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Duration, timeout};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct AppState {
    snapshot_tx: broadcast::Sender<ProtocolSnapshot>,
    latest: Arc<RwLock<LatestState>>,
    registry: Arc<Registry>,
    ws_connections: Arc<AtomicUsize>,
}

pub fn app(
    snapshot_tx: broadcast::Sender<ProtocolSnapshot>,
    latest: Arc<RwLock<LatestState>>,
    registry: Arc<Registry>,
    ws_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        snapshot_tx,
        latest,
        registry,
        ws_connections,
    };
    Router::new()
        .route("/", get(|| async { "restakewatch: ezETH on-chain analytics" })) // GET /
        .route("/version", get(version_handler)) // GET /version
        .route("/api/snapshot", get(snapshot_handler)) // GET /api/snapshot
        .route("/api/registry", get(registry_handler)) // GET /api/registry
        .route("/ws/snapshot", get(ws_snapshot)) // WS /ws/snapshot
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Ping interval for WebSocket connection health.
const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
/// Max time to wait for a send before treating the client as too slow / dead.
const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// GET /version — returns service name and version (from Cargo.toml at build time).
async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/registry — static contract and operator registry.
async fn registry_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(RegistryResponse {
        registry: state.registry.as_ref().clone(),
    })
}

/// GET /api/snapshot — latest snapshot, with the most recent cycle failure
/// attached if one happened after it. 503 while no snapshot exists yet.
async fn snapshot_handler(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest.read().await;
    match &latest.snapshot {
        Some(snapshot) => axum::Json(SnapshotResponse {
            snapshot: snapshot.clone(),
            last_error: latest.last_error.clone(),
        })
        .into_response(),
        None => {
            let body = match &latest.last_error {
                Some(failure) => serde_json::json!(failure),
                None => serde_json::json!({
                    "error": "no snapshot available yet",
                }),
            };
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(body)).into_response()
        }
    }
}

/// Decrements the WS connection count on drop (connect = +1, drop = -1).
struct WsGuard(Arc<AtomicUsize>);

impl Drop for WsGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }
}

async fn ws_snapshot(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let tx = state.snapshot_tx.clone();
    let conn_count = state.ws_connections.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = tx.subscribe();
        if let Err(e) = stream_snapshots(socket, &mut rx, conn_count).await {
            tracing::info!("Snapshot stream error: {}", e);
        }
    })
}

async fn stream_snapshots(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<ProtocolSnapshot>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let _guard = WsGuard(conn_count);
    tracing::info!("Client connected to snapshot stream");

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        let json = serde_json::to_string(&snapshot)?;
                        let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
                        if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                            break;
                        }
                    }
                    // A slow client resumes from the newest snapshot.
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/snapshot client lagged, skipped {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
