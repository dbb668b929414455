//! Axum-based HTTP API exposing snapshot values
//!
//! Each snapshot key is observable on its own (`/api/prices/{key}`), next to
//! the full snapshot with refresh status and the list of sensor descriptors.

use crate::coordinator::CoordinatorState;
use crate::error::{NomosError, Result};
use crate::snapshot::{SnapshotKey, describe, sensor_descriptions};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub state_rx: watch::Receiver<Arc<CoordinatorState>>,
}

impl AppState {
    pub fn new(state_rx: watch::Receiver<Arc<CoordinatorState>>) -> Self {
        Self { state_rx }
    }

    fn current(&self) -> Arc<CoordinatorState> {
        self.state_rx.borrow().clone()
    }
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn version() -> impl IntoResponse {
    Json(json!({ "version": env!("APP_VERSION") }))
}

pub(crate) async fn prices(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.current();
    Json(json!({
        "snapshot": current.snapshot.as_deref().map(|s| s.to_map()),
        "status": current.status,
        "stale": current.is_stale(),
    }))
}

pub(crate) async fn price_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    let Ok(key) = key.parse::<SnapshotKey>() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown key: {}", key) })),
        )
            .into_response();
    };

    let current = state.current();
    let Some(snapshot) = current.snapshot.as_deref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "no price data available yet" })),
        )
            .into_response();
    };

    let description = describe(key);
    Json(json!({
        "key": description.key,
        "name": description.name,
        "unit": description.unit,
        "value": snapshot.value(key),
        "available": current.status.last_update_success,
    }))
    .into_response()
}

pub(crate) async fn sensors() -> impl IntoResponse {
    Json(sensor_descriptions())
}

/// Router with all endpoints bound to `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/prices", get(prices))
        .route("/api/prices/{key}", get(price_value))
        .route("/api/sensors", get(sensors))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind a listener; `host` may be an IP literal (v4 or v6) or a hostname
pub async fn bind(host: &str, port: u16) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((host, port))
        .await
        .map_err(|e| NomosError::web(format!("Failed to bind {}:{}: {}", host, port, e)))
}

/// Serve until `shutdown` flips to `true` or its sender is dropped
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = bind(host, port).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Web API listening on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
        })
        .await
        .map_err(|e| NomosError::web(e.to_string()))
}
