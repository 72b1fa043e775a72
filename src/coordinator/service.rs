//! Client-facing operations over the node pool
//!
//! Every operation reconnects a node before using it and treats a failed
//! call as "skip this node": the handle is dropped to disconnected and the
//! operation carries on with the rest of the pool.

use crate::common::METRICS;
use crate::coordinator::outcome::{
    DeleteReport, ReadOutcome, UploadFailure, UploadMode, UploadOutcome, UploadReport,
};
use crate::coordinator::pool::NodePool;
use crate::node::{DeleteOutcome, NodeId};
use bytes::Bytes;
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Coordinator {
    pool: NodePool,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl Coordinator {
    pub fn new(pool: NodePool) -> Self {
        Self::with_rng(pool, Box::new(StdRng::from_entropy()))
    }

    /// Use `rng` to pick the starting node of each read.
    pub fn with_rng(pool: NodePool, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            pool,
            rng: Mutex::new(rng),
        }
    }

    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    /// Sorted, de-duplicated union of every reachable node's listing.
    ///
    /// All nodes down (or an empty pool) gives an empty listing.
    pub async fn list(&self) -> Vec<String> {
        let listings = join_all((0..self.pool.len()).map(|index| async move {
            let handle = self.pool.connect(index).await?;
            handle
                .invoke(|node| async move { node.list().await })
                .await
                .ok()
        }))
        .await;

        let merged: BTreeSet<String> = listings.into_iter().flatten().flatten().collect();
        debug!(files = merged.len(), "Merged listings");
        merged.into_iter().collect()
    }

    /// First copy found walking the ring from a random start.
    pub async fn download(&self, name: &str) -> ReadOutcome {
        let outcome = self.read_from_ring(name).await;
        METRICS.reads.inc(outcome.label());
        outcome
    }

    async fn read_from_ring(&self, name: &str) -> ReadOutcome {
        if self.pool.is_empty() {
            return ReadOutcome::NoNodesReachable;
        }

        let start = self.next_start();
        let mut answered = false;

        for index in self.pool.ring(start) {
            let Some(handle) = self.pool.connect(index).await else {
                continue;
            };
            match handle
                .invoke(|node| async move { node.download(name).await })
                .await
            {
                Ok(Some(data)) => {
                    debug!(node = %handle.id(), name, size = data.len(), "Served download");
                    return ReadOutcome::Found(data);
                }
                Ok(None) => answered = true,
                Err(_) => continue,
            }
        }

        if answered {
            ReadOutcome::Absent
        } else {
            ReadOutcome::NoNodesReachable
        }
    }

    pub async fn upload(&self, name: &str, data: Bytes, high_reliability: bool) -> UploadOutcome {
        let outcome = match UploadMode::from_high_reliability(high_reliability) {
            UploadMode::ReplicateAll => self.replicate_all(name, data).await,
            UploadMode::LeastLoaded => self.least_loaded(name, data).await,
        };

        METRICS.uploads.inc(outcome.label());
        match &outcome {
            UploadOutcome::Stored(_) => info!("{}", outcome),
            UploadOutcome::Failed(_) => warn!(name, "{}", outcome),
        }
        outcome
    }

    async fn replicate_all(&self, name: &str, data: Bytes) -> UploadOutcome {
        let started = Instant::now();
        let bytes = data.len() as u64;

        let results = join_all((0..self.pool.len()).map(|index| {
            let data = data.clone();
            async move {
                let handle = self.pool.connect(index).await?;
                let stored = handle
                    .invoke(|node| async move { node.upload(name, data).await })
                    .await
                    .unwrap_or(false);
                Some((handle.id(), stored))
            }
        }))
        .await;

        let attempted = results.iter().flatten().count();
        let accepted: Vec<NodeId> = results
            .into_iter()
            .flatten()
            .filter_map(|(id, stored)| stored.then_some(id))
            .collect();
        let elapsed = started.elapsed();

        if attempted == 0 {
            return UploadOutcome::Failed(UploadFailure::NoNodesReachable {
                mode: UploadMode::ReplicateAll,
                elapsed,
            });
        }
        if accepted.is_empty() {
            return UploadOutcome::Failed(UploadFailure::NoneAccepted { attempted, elapsed });
        }

        UploadOutcome::Stored(UploadReport {
            name: name.to_string(),
            mode: UploadMode::ReplicateAll,
            accepted,
            attempted,
            bytes,
            elapsed,
        })
    }

    async fn least_loaded(&self, name: &str, data: Bytes) -> UploadOutcome {
        let started = Instant::now();
        let bytes = data.len() as u64;

        let counts = join_all((0..self.pool.len()).map(|index| async move {
            let handle = self.pool.connect(index).await?;
            let files = handle
                .invoke(|node| async move { node.list().await })
                .await
                .ok()?;
            Some((index, files.len()))
        }))
        .await;

        // Strictly smaller wins, so the lowest index keeps ties
        let mut chosen: Option<(usize, usize)> = None;
        for (index, count) in counts.into_iter().flatten() {
            if chosen.map_or(true, |(_, best)| count < best) {
                chosen = Some((index, count));
            }
        }

        let Some((index, count)) = chosen else {
            return UploadOutcome::Failed(UploadFailure::NoNodesReachable {
                mode: UploadMode::LeastLoaded,
                elapsed: started.elapsed(),
            });
        };

        let handle = &self.pool.handles()[index];
        debug!(node = %handle.id(), files = count, name, "Placing upload on least loaded node");

        match handle
            .invoke(|node| async move { node.upload(name, data).await })
            .await
        {
            Ok(true) => UploadOutcome::Stored(UploadReport {
                name: name.to_string(),
                mode: UploadMode::LeastLoaded,
                accepted: vec![handle.id()],
                attempted: 1,
                bytes,
                elapsed: started.elapsed(),
            }),
            Ok(false) => UploadOutcome::Failed(UploadFailure::Rejected {
                node: handle.id(),
                elapsed: started.elapsed(),
            }),
            Err(_) => UploadOutcome::Failed(UploadFailure::NodeFailed {
                node: handle.id(),
                elapsed: started.elapsed(),
            }),
        }
    }

    /// Best-effort delete on every node. No rollback if some nodes fail.
    pub async fn delete(&self, name: &str) -> DeleteReport {
        let answers = join_all(self.pool.handles().iter().enumerate().map(
            |(index, handle)| async move {
                let outcome = match self.pool.connect(index).await {
                    Some(handle) => handle
                        .invoke(|node| async move { node.delete(name).await })
                        .await
                        .ok(),
                    None => None,
                };
                (handle.id(), outcome)
            },
        ))
        .await;

        let mut report = DeleteReport::new(name);
        for (id, outcome) in answers {
            match outcome {
                Some(DeleteOutcome::Deleted) => report.deleted.push(id),
                Some(DeleteOutcome::NotFound) => report.not_found.push(id),
                Some(DeleteOutcome::InternalError) => report.internal_error.push(id),
                None => report.unreachable.push(id),
            }
        }

        info!("{}", report);
        report
    }

    /// True if any reachable node holds `name`; unreachable nodes count as
    /// not holding it.
    pub async fn file_exists(&self, name: &str) -> bool {
        for index in 0..self.pool.len() {
            let Some(handle) = self.pool.connect(index).await else {
                continue;
            };
            if let Ok(true) = handle
                .invoke(|node| async move { node.file_exists(name).await })
                .await
            {
                return true;
            }
        }
        false
    }

    fn next_start(&self) -> usize {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..self.pool.len())
    }
}
