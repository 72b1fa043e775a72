//! Client-facing HTTP API for the coordinator
//!
//! | Operation   | Route                                        |
//! |-------------|----------------------------------------------|
//! | list        | `GET /files`                                 |
//! | download    | `GET /files/:name`                           |
//! | upload      | `PUT /files/:name?high_reliability=bool`     |
//! | delete      | `DELETE /files/:name`                        |
//! | file exists | `GET /exists/:name`                          |
//!
//! Names are percent-encoded into a single path segment.

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::METRICS;
use crate::coordinator::outcome::ReadOutcome;
use crate::coordinator::service::Coordinator;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared coordinator state for HTTP handlers.
#[derive(Clone)]
pub struct CoordState {
    pub coordinator: Arc<Coordinator>,
    pub name_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub high_reliability: bool,
}

/// Creates the client-facing router.
pub fn create_router(state: CoordState, max_file_size: usize) -> Router {
    Router::new()
        .route("/files", get(list_files))
        .route(
            "/files/:name",
            get(download_file).put(upload_file).delete(delete_file),
        )
        .route("/exists/:name", get(file_exists))
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route_layer(axum::middleware::from_fn(request_tracing_middleware))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_files(State(state): State<CoordState>) -> impl IntoResponse {
    Json(state.coordinator.list().await)
}

async fn download_file(State(state): State<CoordState>, Path(name): Path<String>) -> Response {
    match state.coordinator.download(&name).await {
        ReadOutcome::Found(data) => {
            METRICS.bytes_read.add(data.len() as u64);
            (StatusCode::OK, data).into_response()
        }
        ReadOutcome::Absent => (
            StatusCode::NOT_FOUND,
            format!("File '{}' does not exist on the available nodes", name),
        )
            .into_response(),
        ReadOutcome::NoNodesReachable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "No storage nodes reachable".to_string(),
        )
            .into_response(),
    }
}

async fn upload_file(
    State(state): State<CoordState>,
    Path(name): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let size = body.len() as u64;
    let outcome = state
        .coordinator
        .upload(&name, body, params.high_reliability)
        .await;

    if outcome.is_stored() {
        METRICS.bytes_written.add(size);
        (StatusCode::OK, outcome.to_string()).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, outcome.to_string()).into_response()
    }
}

async fn delete_file(State(state): State<CoordState>, Path(name): Path<String>) -> Response {
    let report = state.coordinator.delete(&name).await;
    (StatusCode::OK, report.to_string()).into_response()
}

async fn file_exists(
    State(state): State<CoordState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    Json(state.coordinator.file_exists(&name).await)
}

/// Pool status: which nodes currently hold a live connection
async fn status(State(state): State<CoordState>) -> impl IntoResponse {
    let nodes: Vec<_> = state
        .coordinator
        .pool()
        .status()
        .into_iter()
        .map(|s| {
            json!({
                "id": s.id.0,
                "name": s.id.registry_name(&state.name_prefix),
                "connected": s.connected,
            })
        })
        .collect();
    let connected = nodes
        .iter()
        .filter(|n| n["connected"].as_bool().unwrap_or(false))
        .count();

    Json(json!({
        "num_nodes": nodes.len(),
        "connected": connected,
        "nodes": nodes,
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "alive": true,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

async fn metrics() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        METRICS.to_prometheus(),
    )
}
