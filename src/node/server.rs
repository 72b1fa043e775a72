//! Storage node server

use crate::common::{retry_with_backoff, NodeConfig, Result};
use crate::discovery::RemoteNameService;
use crate::node::http::{create_router, NodeState};
use crate::node::rpc::NodeId;
use crate::node::store::FileStore;
use std::sync::Arc;
use std::time::Duration;

const REGISTER_ATTEMPTS: usize = 10;

pub struct NodeServer {
    config: NodeConfig,
}

impl NodeServer {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;

        let node_id = NodeId(self.config.id);
        let name = node_id.registry_name(&self.config.name_prefix);
        let data_dir = self.config.data_dir();
        let advertise = self.config.advertise_url();

        tracing::info!("Starting storage node {} ({})", node_id, name);
        tracing::info!("  RPC API: {}", self.config.bind_addr());
        tracing::info!("  Advertised as: {}", advertise);
        tracing::info!("  Data path: {}", data_dir.display());
        tracing::info!("  Registry: {}", self.config.registry_url);

        let store = FileStore::open(node_id, &data_dir).await?;
        tracing::info!("Node {} storing files under {}", store.id(), store.root().display());
        let router = create_router(
            NodeState {
                node_id,
                store: Arc::new(store),
            },
            self.config.max_file_size as usize,
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;

        // Bind the name only once the listener accepts connections
        let registry = RemoteNameService::new(&self.config.registry_url, Duration::from_secs(5))?;
        retry_with_backoff(
            || registry.rebind(&name, &advertise),
            REGISTER_ATTEMPTS,
            Duration::from_millis(200),
        )
        .await?;
        tracing::info!("Bound {} -> {} in registry", name, advertise);

        tracing::info!("✓ Storage node ready");

        let server = axum::serve(listener, router);
        tokio::select! {
            res = server => {
                if let Err(e) = res {
                    tracing::error!("HTTP server error: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down storage node {}", node_id);
                if let Err(e) = registry.unbind(&name).await {
                    tracing::warn!("Could not unbind {}: {}", name, e);
                }
            }
        }

        Ok(())
    }
}
