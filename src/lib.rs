//! # minifs
//!
//! A small distributed file store:
//! - One coordinator fronting a fixed pool of storage nodes
//! - Reads fail over around a randomly started ring of nodes
//! - Writes either replicate to every node or go to the least loaded one
//! - Node failures are absorbed; unreachable nodes are retried lazily
//!
//! ## Architecture
//!
//! ```text
//!            clients (minifs CLI, HTTP)
//!                       │
//! ┌─────────────────────▼───────────────────┐
//! │               Coordinator               │
//! │  client API + registry (FileServer{id}) │
//! │  NodePool: handle 1 … handle N          │
//! └───────────┬─────────────────────────────┘
//!             │ HTTP RPC
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Node 1     │   │ Node 2     │   │ Node 3       │
//! │ files_1/   │   │ files_2/   │   │ files_3/     │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a coordinator
//! ```bash
//! minifs-coord serve --bind 0.0.0.0:5000 --nodes 3
//! ```
//!
//! ### Start storage nodes
//! ```bash
//! minifs-node serve --id 1 --bind 127.0.0.1:6001 --registry http://localhost:5000
//! ```
//!
//! ### Use the CLI
//! ```bash
//! minifs put ./report.pdf --name docs/report.pdf --high-reliability
//! minifs get docs/report.pdf --output ./copy.pdf
//! minifs list
//! minifs delete docs/report.pdf
//! ```

pub mod client;
pub mod common;
pub mod coordinator;
pub mod discovery;
pub mod node;

pub use client::CoordinatorClient;
pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;
pub use node::NodeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
