//! Storage node binary

use anyhow::Result;
use clap::{Parser, Subcommand};
use minifs::common::{Config, NodeConfig};
use minifs::NodeServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minifs-node")]
#[command(about = "minifs storage node: serves one local file tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a storage node and bind it in the registry
    Serve {
        /// Node ID (1..=N)
        #[arg(long)]
        id: Option<u32>,

        /// Address to listen on
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Address published to the registry (defaults to --bind)
        #[arg(long)]
        advertise: Option<String>,

        /// Root directory for stored files
        #[arg(long)]
        data: Option<PathBuf>,

        /// Registry (coordinator) URL
        #[arg(long)]
        registry: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
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
            id,
            bind,
            advertise,
            data,
            registry,
        } => {
            // Port and data dir derive from the id unless set explicitly
            let mut node_config = match (config.node, id) {
                (Some(file_conf), None) => file_conf,
                (Some(file_conf), Some(id)) => NodeConfig {
                    id,
                    ..file_conf
                },
                (None, id) => NodeConfig::for_id(id.unwrap_or(1)),
            };
            if let Some(bind) = bind {
                node_config.bind_addr = Some(bind);
            }
            if advertise.is_some() {
                node_config.advertise_addr = advertise;
            }
            if data.is_some() {
                node_config.data_dir = data;
            }
            if let Some(registry) = registry {
                node_config.registry_url = registry;
            }

            NodeServer::new(node_config).serve().await?;
        }
    }

    Ok(())
}
