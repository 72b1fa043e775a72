//! Coordinator binary

use clap::{Parser, Subcommand};
use minifs::common::{Config, CoordinatorConfig};
use minifs::coordinator::CoordinatorServer;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minifs-coord")]
#[command(about = "minifs coordinator: one file store over a fixed pool of nodes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Bind address for the client API and registry
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Number of storage nodes in the pool
        #[arg(long)]
        nodes: Option<u32>,

        /// Per-call timeout for node RPCs, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Static registry bindings, `name=url` (comma-separated)
        #[arg(long, value_delimiter = ',')]
        bind_node: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config from file/env, then override with CLI arguments
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            nodes,
            timeout_ms,
            bind_node,
        } => {
            let mut coord_config: CoordinatorConfig = config.coordinator.unwrap_or_default();
            if let Some(bind) = bind {
                coord_config.bind_addr = bind;
            }
            if let Some(nodes) = nodes {
                coord_config.num_nodes = nodes;
            }
            if let Some(timeout_ms) = timeout_ms {
                coord_config.call_timeout_ms = timeout_ms;
            }
            for binding in bind_node {
                let (name, url) = binding
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("expected name=url, got {}", binding))?;
                coord_config.nodes.insert(name.to_string(), url.to_string());
            }

            CoordinatorServer::new(coord_config).serve().await?;
        }
    }

    Ok(())
}
