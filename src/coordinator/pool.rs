//! Fixed-size pool of node handles
//!
//! Slot `i` holds node `i + 1`. The pool never grows or shrinks after
//! construction.

use crate::coordinator::handle::{NodeHandle, NodeStatus};
use crate::discovery::Discovery;
use crate::node::NodeId;
use std::sync::Arc;

pub struct NodePool {
    handles: Vec<NodeHandle>,
    discovery: Arc<dyn Discovery>,
}

impl NodePool {
    /// All handles start disconnected.
    pub fn new(num_nodes: usize, discovery: Arc<dyn Discovery>) -> Self {
        let handles = (0..num_nodes)
            .map(|index| NodeHandle::new(NodeId::from_index(index)))
            .collect();
        Self { handles, discovery }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[NodeHandle] {
        &self.handles
    }

    /// Visit slot `index`, reconnecting first. `None` if the node cannot be
    /// reached right now.
    pub async fn connect(&self, index: usize) -> Option<&NodeHandle> {
        let handle = self.handles.get(index)?;
        if handle.ensure_connected(self.discovery.as_ref()).await {
            Some(handle)
        } else {
            None
        }
    }

    /// Slot indices `start, start + 1, …` wrapping around, each exactly once
    pub fn ring(&self, start: usize) -> impl Iterator<Item = usize> {
        let len = self.handles.len();
        (0..len).map(move |offset| (start + offset) % len)
    }

    pub fn status(&self) -> Vec<NodeStatus> {
        self.handles.iter().map(NodeHandle::status).collect()
    }
}
