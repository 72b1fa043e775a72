//! Node discovery
//!
//! Each storage node publishes itself as `{prefix}{id}` in a name registry.
//! The coordinator is handed a [`Discovery`] at construction and resolves a
//! node into a [`StorageNode`] capability only when it needs one.

pub mod registry;
pub mod remote;

pub use registry::{registry_router, Binding, Registry};
pub use remote::RemoteNameService;

use crate::common::Result;
use crate::coordinator::node_client::HttpNodeClient;
use crate::node::{NodeId, StorageNode};
use std::sync::Arc;
use std::time::Duration;

/// Resolves a published name to a node endpoint.
#[async_trait::async_trait]
pub trait NameService: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<String>;
}

/// Turns a node id into a usable capability.
#[async_trait::async_trait]
pub trait Discovery: Send + Sync {
    async fn lookup(&self, id: NodeId) -> Result<Arc<dyn StorageNode>>;
}

/// Discovery backed by a [`NameService`], producing HTTP node clients.
pub struct RegistryDiscovery {
    names: Arc<dyn NameService>,
    prefix: String,
    client: reqwest::Client,
}

impl RegistryDiscovery {
    /// `call_timeout` bounds every RPC made through the returned capabilities.
    pub fn new(names: Arc<dyn NameService>, prefix: &str, call_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .connect_timeout(call_timeout)
            .build()?;
        Ok(Self {
            names,
            prefix: prefix.to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl Discovery for RegistryDiscovery {
    async fn lookup(&self, id: NodeId) -> Result<Arc<dyn StorageNode>> {
        let name = id.registry_name(&self.prefix);
        let endpoint = self.names.resolve(&name).await?;
        tracing::debug!(node = %id, "Resolved {} -> {}", name, endpoint);
        Ok(Arc::new(HttpNodeClient::new(
            id,
            endpoint,
            self.client.clone(),
        )))
    }
}
