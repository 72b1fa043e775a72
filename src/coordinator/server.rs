//! Coordinator server

use crate::common::{CoordinatorConfig, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::pool::NodePool;
use crate::coordinator::service::Coordinator;
use crate::discovery::{registry_router, Registry, RegistryDiscovery};
use axum::Router;
use std::sync::Arc;

pub struct CoordinatorServer {
    config: CoordinatorConfig,
}

impl CoordinatorServer {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Build the coordinator and its router: client-facing API plus the
    /// registry storage nodes bind themselves in.
    pub fn build(&self) -> Result<(Arc<Coordinator>, Router)> {
        self.config.validate()?;

        let registry = Arc::new(Registry::from_bindings(self.config.nodes.clone()));
        let discovery = RegistryDiscovery::new(
            registry.clone(),
            &self.config.name_prefix,
            self.config.call_timeout(),
        )?;
        let pool = NodePool::new(self.config.num_nodes as usize, Arc::new(discovery));
        let coordinator = Arc::new(Coordinator::new(pool));

        let router = create_router(
            CoordState {
                coordinator: coordinator.clone(),
                name_prefix: self.config.name_prefix.clone(),
            },
            self.config.max_file_size as usize,
        )
        .merge(registry_router(registry));

        Ok((coordinator, router))
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Nodes: {}", self.config.num_nodes);
        tracing::info!("  Call timeout: {:?}", self.config.call_timeout());
        for (name, address) in &self.config.nodes {
            tracing::info!("  Static binding: {} -> {}", name, address);
        }

        let (_coordinator, router) = self.build()?;
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!("✓ Coordinator ready");

        tokio::select! {
            res = axum::serve(listener, router) => {
                if let Err(e) = res {
                    tracing::error!("HTTP server error: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down coordinator");
            }
        }

        Ok(())
    }
}
