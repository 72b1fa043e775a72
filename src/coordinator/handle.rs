//! Per-node connection state
//!
//! A handle starts `Disconnected`, becomes `Connected` only through a
//! successful lookup, and drops back the moment a call through it fails.
//! Reconnection is lazy: the next operation that visits the node retries
//! the lookup.

use crate::common::METRICS;
use crate::discovery::Discovery;
use crate::node::{NodeError, NodeId, StorageNode};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub enum ConnectionState {
    Disconnected,
    Connected(Arc<dyn StorageNode>),
}

/// Snapshot of one handle, for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub id: NodeId,
    pub connected: bool,
}

pub struct NodeHandle {
    id: NodeId,
    state: Mutex<ConnectionState>,
}

impl NodeHandle {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.lock(), ConnectionState::Connected(_))
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            id: self.id,
            connected: self.is_connected(),
        }
    }

    /// Look the node up if it is disconnected. Returns whether the handle is
    /// connected afterwards; lookup failures are logged, not returned.
    pub async fn ensure_connected(&self, discovery: &dyn Discovery) -> bool {
        if self.is_connected() {
            return true;
        }

        // The lock is not held across the lookup
        match discovery.lookup(self.id).await {
            Ok(node) => {
                let mut state = self.lock();
                if let ConnectionState::Disconnected = *state {
                    *state = ConnectionState::Connected(node);
                    METRICS.node_reconnects.inc(self.id.to_string());
                    info!(node = %self.id, "Connected to storage node");
                }
                true
            }
            Err(e) => {
                METRICS.node_lookup_failures.inc(self.id.to_string());
                warn!(node = %self.id, "Could not retrieve storage node: {}", e);
                false
            }
        }
    }

    /// Run `call` against the node's capability.
    ///
    /// A disconnected handle fails immediately. If the call fails, the handle
    /// is marked disconnected and the error is handed back so the caller can
    /// move on to other nodes.
    pub async fn invoke<T, F, Fut>(&self, call: F) -> Result<T, NodeError>
    where
        F: FnOnce(Arc<dyn StorageNode>) -> Fut,
        Fut: Future<Output = Result<T, NodeError>>,
    {
        let node = match &*self.lock() {
            ConnectionState::Connected(node) => node.clone(),
            ConnectionState::Disconnected => {
                return Err(NodeError::Unreachable(format!(
                    "node {} is disconnected",
                    self.id
                )))
            }
        };

        match call(node.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.invalidate(&node, &e);
                Err(e)
            }
        }
    }

    /// Drop the capability, unless it was already replaced by a newer one.
    fn invalidate(&self, failed: &Arc<dyn StorageNode>, err: &NodeError) {
        let mut state = self.lock();
        if let ConnectionState::Connected(current) = &*state {
            if std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(failed)) {
                *state = ConnectionState::Disconnected;
                METRICS.node_disconnects.inc(self.id.to_string());
                warn!(node = %self.id, "Storage node disconnected: {}", err);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
