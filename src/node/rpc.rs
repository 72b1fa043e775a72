//! Storage node RPC contract
//!
//! The coordinator only ever talks to a node through [`StorageNode`]. Every
//! operation has an application-level answer (absent file, `false`,
//! [`DeleteOutcome`]) and a separate [`NodeError`] channel that means the
//! node could not be reached or did not answer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable node identity in `1..=N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id for pool slot `index` (slot 0 is node 1)
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32 + 1)
    }

    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    /// Name this node publishes itself under in the registry
    pub fn registry_name(self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connectivity failure talking to a node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NodeError {
    #[error("node unreachable: {0}")]
    Unreachable(String),
    #[error("node call timed out: {0}")]
    Timeout(String),
    #[error("unexpected node response: {0}")]
    Protocol(String),
}

/// A node's answer to a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    NotFound,
    InternalError,
    Deleted,
}

/// Capability for one storage node.
#[async_trait::async_trait]
pub trait StorageNode: Send + Sync {
    /// Relative names of every stored file, `/`-separated.
    async fn list(&self) -> Result<Vec<String>, NodeError>;

    /// File contents, or `None` when the node does not hold `name`.
    async fn download(&self, name: &str) -> Result<Option<Bytes>, NodeError>;

    /// Store `data` under `name`, replacing any previous contents.
    async fn upload(&self, name: &str, data: Bytes) -> Result<bool, NodeError>;

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, NodeError>;

    async fn file_exists(&self, name: &str) -> Result<bool, NodeError>;
}
