//! In-process name registry and its HTTP surface
//!
//! Storage nodes rebind `FileServer{id}` to their endpoint when they start;
//! the coordinator resolves names lazily. The registry lives in the
//! coordinator process and is served next to the client-facing API.

use crate::common::{Error, Result};
use crate::discovery::NameService;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Name → endpoint table.
#[derive(Debug, Default)]
pub struct Registry {
    bindings: RwLock<BTreeMap<String, String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with static bindings (from configuration)
    pub fn from_bindings(bindings: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            bindings: RwLock::new(bindings.into_iter().collect()),
        }
    }

    /// Bind `name`, replacing any previous endpoint
    pub fn rebind(&self, name: &str, address: &str) -> Option<String> {
        self.write().insert(name.to_string(), address.to_string())
    }

    pub fn unbind(&self, name: &str) -> Result<String> {
        self.write()
            .remove(name)
            .ok_or_else(|| Error::NotBound(name.to_string()))
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        self.read().get(name).cloned()
    }

    pub fn bindings(&self) -> BTreeMap<String, String> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.bindings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.bindings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl NameService for Registry {
    async fn resolve(&self, name: &str) -> Result<String> {
        self.lookup(name)
            .ok_or_else(|| Error::NotBound(name.to_string()))
    }
}

/// Wire form of one binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
struct RebindRequest {
    address: String,
}

/// Routes for `/registry`, merged into the coordinator router.
pub fn registry_router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/registry", get(list_bindings))
        .route(
            "/registry/:name",
            get(resolve_binding).put(rebind).delete(unbind),
        )
        .with_state(registry)
}

async fn list_bindings(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    Json(json!({ "bindings": registry.bindings() }))
}

async fn resolve_binding(
    State(registry): State<Arc<Registry>>,
    Path(name): Path<String>,
) -> Response {
    match registry.lookup(&name) {
        Some(address) => Json(Binding { name, address }).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{} is not bound", name) })),
        )
            .into_response(),
    }
}

async fn rebind(
    State(registry): State<Arc<Registry>>,
    Path(name): Path<String>,
    Json(req): Json<RebindRequest>,
) -> impl IntoResponse {
    match registry.rebind(&name, &req.address) {
        Some(previous) if previous != req.address => {
            tracing::info!("Rebound {}: {} -> {}", name, previous, req.address)
        }
        Some(_) => tracing::debug!("Refreshed binding {} -> {}", name, req.address),
        None => tracing::info!("Bound {} -> {}", name, req.address),
    }
    Json(Binding {
        name,
        address: req.address,
    })
}

async fn unbind(State(registry): State<Arc<Registry>>, Path(name): Path<String>) -> Response {
    match registry.unbind(&name) {
        Ok(address) => {
            tracing::info!("Unbound {} ({})", name, address);
            Json(Binding { name, address }).into_response()
        }
        Err(e) => (
            e.to_http_status(),
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
