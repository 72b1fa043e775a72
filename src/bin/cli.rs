//! CLI for storing and retrieving files through the coordinator

use anyhow::Context;
use clap::{Parser, Subcommand};
use minifs::CoordinatorClient;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Default directory for files read or written by the client
const CLIENT_DIR: &str = "client_files";

#[derive(Parser)]
#[command(name = "minifs")]
#[command(about = "minifs distributed file store CLI")]
#[command(version)]
struct Cli {
    /// Coordinator URL
    #[arg(long, default_value = "http://localhost:5000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every stored file
    List,

    /// Download a file
    Get {
        /// Name on the store
        name: String,

        /// Output file (defaults to client_files/<basename>)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Upload a file
    Put {
        /// Local file
        file: PathBuf,

        /// Name on the store (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Replicate to every node instead of the least loaded one
        #[arg(long)]
        high_reliability: bool,
    },

    /// Delete a file from every node
    Delete {
        /// Name on the store
        name: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Check whether any reachable node holds a file
    Exists { name: String },

    /// Show which nodes the coordinator is connected to
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = CoordinatorClient::new(&cli.coordinator)?;

    match cli.command {
        Commands::List => {
            let listings = client.list().await?;
            if listings.is_empty() {
                println!("Server contains no listings");
            } else {
                println!("Listings:");
                for listing in listings {
                    println!("  {}", listing);
                }
            }
        }

        Commands::Get { name, output } => match client.download(&name).await? {
            Some(data) => {
                let output = output.unwrap_or_else(|| default_output(&name));
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&output, &data)
                    .with_context(|| format!("writing {}", output.display()))?;
                println!("Saved {} bytes to {}", data.len(), output.display());
            }
            None => {
                println!("File does not exist on the available servers");
            }
        },

        Commands::Put {
            file,
            name,
            high_reliability,
        } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("cannot derive a name from the path; pass --name")?,
            };
            let response = client.upload(&name, data.into(), high_reliability).await?;
            println!("{}", response);
        }

        Commands::Delete { name, yes } => {
            if !client.file_exists(&name).await? {
                println!("'{}' does not exist on the available servers", name);
                return Ok(());
            }
            if !yes && !confirm(&format!("Delete '{}'?", name))? {
                println!("Aborted");
                return Ok(());
            }
            println!("{}", client.delete(&name).await?);
        }

        Commands::Exists { name } => {
            let exists = client.file_exists(&name).await?;
            println!("{}", if exists { "yes" } else { "no" });
        }

        Commands::Status => {
            let status = client.status().await?;
            println!(
                "Connected to {} of {} node(s):",
                status.connected, status.num_nodes
            );
            for node in status.nodes {
                let state = if node.connected { "connected" } else { "disconnected" };
                println!("  {} ({}): {}", node.id, node.name, state);
            }
        }
    }

    Ok(())
}

fn default_output(name: &str) -> PathBuf {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| name.into());
    Path::new(CLIENT_DIR).join(base)
}

fn confirm(question: &str) -> std::io::Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
