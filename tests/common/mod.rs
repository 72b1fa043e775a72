//! In-memory storage nodes for coordinator tests

#![allow(dead_code)]

use bytes::Bytes;
use minifs::common::{Error, Result};
use minifs::coordinator::{Coordinator, NodePool};
use minifs::discovery::Discovery;
use minifs::node::{DeleteOutcome, NodeError, NodeId, StorageNode};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeNode {
    files: Mutex<BTreeMap<String, Bytes>>,
    /// Unreachable: lookups and calls fail
    down: AtomicBool,
    /// Reachable, but upload answers `false`
    refuse_uploads: AtomicBool,
    /// Reachable, but upload fails as if the node dropped mid-call
    drop_uploads: AtomicBool,
    pub calls: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl FakeNode {
    pub fn with_files(names: &[&str]) -> Self {
        let node = Self::default();
        for name in names {
            node.put(name, Bytes::from(format!("contents of {}", name)));
        }
        node
    }

    pub fn put(&self, name: &str, data: Bytes) {
        self.files.lock().unwrap().insert(name.to_string(), data);
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn refuse_uploads(&self) {
        self.refuse_uploads.store(true, Ordering::SeqCst);
    }

    pub fn drop_uploads(&self) {
        self.drop_uploads.store(true, Ordering::SeqCst);
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }

    fn check(&self) -> std::result::Result<(), NodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.is_down() {
            Err(NodeError::Unreachable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl StorageNode for FakeNode {
    async fn list(&self) -> std::result::Result<Vec<String>, NodeError> {
        self.check()?;
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    async fn download(&self, name: &str) -> std::result::Result<Option<Bytes>, NodeError> {
        self.check()?;
        Ok(self.get(name))
    }

    async fn upload(&self, name: &str, data: Bytes) -> std::result::Result<bool, NodeError> {
        self.check()?;
        if self.drop_uploads.load(Ordering::SeqCst) {
            return Err(NodeError::Timeout("upload".into()));
        }
        if self.refuse_uploads.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.put(name, data);
        Ok(true)
    }

    async fn delete(&self, name: &str) -> std::result::Result<DeleteOutcome, NodeError> {
        self.check()?;
        match self.files.lock().unwrap().remove(name) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn file_exists(&self, name: &str) -> std::result::Result<bool, NodeError> {
        self.check()?;
        Ok(self.has(name))
    }
}

/// Resolves node `id` to `nodes[id - 1]` unless that node is down.
pub struct FakeDiscovery {
    pub nodes: Vec<Arc<FakeNode>>,
}

#[async_trait::async_trait]
impl Discovery for FakeDiscovery {
    async fn lookup(&self, id: NodeId) -> Result<Arc<dyn StorageNode>> {
        let node = self
            .nodes
            .get(id.index())
            .ok_or_else(|| Error::NotBound(id.registry_name("FileServer")))?;
        node.lookups.fetch_add(1, Ordering::SeqCst);
        if node.is_down() {
            return Err(Error::NotBound(id.registry_name("FileServer")));
        }
        Ok(node.clone())
    }
}

pub struct Cluster {
    pub nodes: Vec<Arc<FakeNode>>,
    pub coordinator: Coordinator,
}

impl Cluster {
    pub fn new(nodes: Vec<FakeNode>) -> Self {
        Self::seeded(nodes, 7)
    }

    /// Reads start from a node chosen by a generator seeded with `seed`
    pub fn seeded(nodes: Vec<FakeNode>, seed: u64) -> Self {
        Self::with_rng(nodes, Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Every read starts at slot `start`
    pub fn starting_at(nodes: Vec<FakeNode>, start: usize) -> Self {
        let len = nodes.len();
        Self::with_rng(nodes, Box::new(FixedStart::new(start, len)))
    }

    fn with_rng(nodes: Vec<FakeNode>, rng: Box<dyn RngCore + Send>) -> Self {
        let nodes: Vec<Arc<FakeNode>> = nodes.into_iter().map(Arc::new).collect();
        let discovery = FakeDiscovery {
            nodes: nodes.clone(),
        };
        let pool = NodePool::new(nodes.len(), Arc::new(discovery));
        let coordinator = Coordinator::with_rng(pool, rng);
        Self { nodes, coordinator }
    }

    pub fn empty(count: usize) -> Self {
        Self::new((0..count).map(|_| FakeNode::default()).collect())
    }

    pub fn node(&self, id: u32) -> &FakeNode {
        &self.nodes[NodeId(id).index()]
    }

    pub fn is_connected(&self, id: u32) -> bool {
        self.coordinator.pool().handles()[NodeId(id).index()].is_connected()
    }
}

/// Generator whose `gen_range(0..len)` always yields `start`.
///
/// Uniform integer sampling takes the high word of `v * len`; with
/// `v = start * (u64::MAX / len + 1)` that word is exactly `start` and the
/// low word stays tiny, so the sample is never rejected.
pub struct FixedStart {
    word: u64,
}

impl FixedStart {
    pub fn new(start: usize, len: usize) -> Self {
        assert!(start < len);
        let step = u64::MAX / len as u64 + 1;
        Self {
            word: start as u64 * step,
        }
    }
}

impl RngCore for FixedStart {
    fn next_u32(&mut self) -> u32 {
        (self.word >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.word
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let bytes = self.word.to_le_bytes();
        for chunk in dest.chunks_mut(bytes.len()) {
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
