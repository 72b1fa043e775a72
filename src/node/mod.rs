//! Storage node
//!
//! A node serves list/download/upload/delete/exists against its own local
//! file tree. The coordinator reaches it through the [`StorageNode`]
//! capability; [`FileStore`] is the local implementation and
//! [`http`] exposes it over the wire.

pub mod http;
pub mod rpc;
pub mod server;
pub mod store;

pub use rpc::{DeleteOutcome, NodeError, NodeId, StorageNode};
pub use server::NodeServer;
pub use store::FileStore;
