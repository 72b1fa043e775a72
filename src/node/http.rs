//! HTTP binding of the storage node RPC contract
//!
//! File names travel as one percent-encoded path segment; see
//! [`crate::common::encode_name`].

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::METRICS;
use crate::node::rpc::{NodeId, StorageNode};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared node state for HTTP handlers.
#[derive(Clone)]
pub struct NodeState {
    pub node_id: NodeId,
    pub store: Arc<dyn StorageNode>,
}

/// Upload acknowledgement
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
}

/// Creates the node RPC router.
pub fn create_router(state: NodeState, max_file_size: usize) -> Router {
    Router::new()
        .route("/files", get(list_files))
        .route(
            "/files/:name",
            get(download_file).put(upload_file).delete(delete_file),
        )
        .route("/exists/:name", get(file_exists))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route_layer(axum::middleware::from_fn(request_tracing_middleware))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any contract-level error is answered as 500, which the coordinator's
/// client treats as a failed call.
fn rpc_failure(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

async fn list_files(State(state): State<NodeState>) -> Response {
    match state.store.list().await {
        Ok(files) => Json(files).into_response(),
        Err(e) => rpc_failure(e),
    }
}

async fn download_file(State(state): State<NodeState>, Path(name): Path<String>) -> Response {
    match state.store.download(&name).await {
        Ok(Some(data)) => {
            METRICS.bytes_read.add(data.len() as u64);
            (StatusCode::OK, data).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "file not found").into_response(),
        Err(e) => rpc_failure(e),
    }
}

async fn upload_file(
    State(state): State<NodeState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let size = body.len() as u64;
    match state.store.upload(&name, body).await {
        Ok(ok) => {
            if ok {
                METRICS.bytes_written.add(size);
            }
            Json(UploadResponse { ok }).into_response()
        }
        Err(e) => rpc_failure(e),
    }
}

async fn delete_file(State(state): State<NodeState>, Path(name): Path<String>) -> Response {
    match state.store.delete(&name).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => rpc_failure(e),
    }
}

async fn file_exists(State(state): State<NodeState>, Path(name): Path<String>) -> Response {
    match state.store.file_exists(&name).await {
        Ok(exists) => Json(exists).into_response(),
        Err(e) => rpc_failure(e),
    }
}

async fn health(State(state): State<NodeState>) -> impl IntoResponse {
    let files = state.store.list().await.map(|f| f.len()).ok();
    Json(json!({
        "node_id": state.node_id.0,
        "files": files,
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
