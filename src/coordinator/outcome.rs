//! Aggregate results the coordinator hands back to clients
//!
//! Per-node failures are folded into these values; nothing here carries a
//! raw transport error.

use crate::common::format_bytes;
use crate::node::NodeId;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// Result of a read across the failover ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(Bytes),
    /// At least one node answered and none held the file
    Absent,
    /// No node could be reached at all
    NoNodesReachable,
}

impl ReadOutcome {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            ReadOutcome::Found(_) => "found",
            ReadOutcome::Absent => "absent",
            ReadOutcome::NoNodesReachable => "no_nodes_reachable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Write to every node; accepted if any node accepts
    ReplicateAll,
    /// Write to the reachable node holding the fewest files
    LeastLoaded,
}

impl UploadMode {
    pub fn from_high_reliability(high_reliability: bool) -> Self {
        if high_reliability {
            UploadMode::ReplicateAll
        } else {
            UploadMode::LeastLoaded
        }
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadMode::ReplicateAll => write!(f, "high reliability"),
            UploadMode::LeastLoaded => write!(f, "least loaded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub name: String,
    pub mode: UploadMode,
    /// Nodes that stored the file
    pub accepted: Vec<NodeId>,
    /// Nodes an upload was sent to
    pub attempted: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    NoNodesReachable { mode: UploadMode, elapsed: Duration },
    /// Replicate-all reached nodes but none stored the file
    NoneAccepted { attempted: usize, elapsed: Duration },
    /// The least-loaded node refused the write
    Rejected { node: NodeId, elapsed: Duration },
    /// The least-loaded node failed mid-call
    NodeFailed { node: NodeId, elapsed: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Stored(UploadReport),
    Failed(UploadFailure),
}

impl UploadOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, UploadOutcome::Stored(_))
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            UploadOutcome::Stored(_) => "stored",
            UploadOutcome::Failed(UploadFailure::NoNodesReachable { .. }) => "no_nodes_reachable",
            UploadOutcome::Failed(UploadFailure::NoneAccepted { .. }) => "none_accepted",
            UploadOutcome::Failed(UploadFailure::Rejected { .. }) => "rejected",
            UploadOutcome::Failed(UploadFailure::NodeFailed { .. }) => "node_failed",
        }
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadOutcome::Stored(report) => {
                let nodes: Vec<String> = report.accepted.iter().map(|id| id.to_string()).collect();
                write!(
                    f,
                    "Uploaded '{}' ({}) to {} of {} node(s) [{}] in {} ms ({})",
                    report.name,
                    format_bytes(report.bytes),
                    report.accepted.len(),
                    report.attempted,
                    nodes.join(", "),
                    report.elapsed.as_millis(),
                    report.mode
                )
            }
            UploadOutcome::Failed(UploadFailure::NoNodesReachable { mode, elapsed }) => write!(
                f,
                "Upload failed: no storage nodes reachable ({}, {} ms)",
                mode,
                elapsed.as_millis()
            ),
            UploadOutcome::Failed(UploadFailure::NoneAccepted { attempted, elapsed }) => write!(
                f,
                "Upload failed: none of {} node(s) stored the file ({} ms)",
                attempted,
                elapsed.as_millis()
            ),
            UploadOutcome::Failed(UploadFailure::Rejected { node, elapsed }) => write!(
                f,
                "Upload failed: node {} could not store the file ({} ms)",
                node,
                elapsed.as_millis()
            ),
            UploadOutcome::Failed(UploadFailure::NodeFailed { node, elapsed }) => write!(
                f,
                "Upload failed: node {} stopped responding ({} ms)",
                node,
                elapsed.as_millis()
            ),
        }
    }
}

/// Tally of a delete fanned out to every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub name: String,
    pub deleted: Vec<NodeId>,
    pub not_found: Vec<NodeId>,
    pub internal_error: Vec<NodeId>,
    pub unreachable: Vec<NodeId>,
}

impl DeleteReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Nodes that answered, whatever the answer
    pub fn responded(&self) -> usize {
        self.deleted.len() + self.not_found.len() + self.internal_error.len()
    }
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.responded() == 0 {
            return write!(
                f,
                "Delete failed: no storage nodes reachable, '{}' was not deleted",
                self.name
            );
        }

        if !self.deleted.is_empty() {
            write!(f, "Deleted '{}' from {} node(s)", self.name, self.deleted.len())?;
            if !self.not_found.is_empty() {
                write!(f, ", absent on {}", self.not_found.len())?;
            }
            if !self.internal_error.is_empty() {
                write!(f, ", failed on {}", self.internal_error.len())?;
            }
        } else if !self.internal_error.is_empty() {
            write!(
                f,
                "Delete failed: could not remove '{}' on {} node(s)",
                self.name,
                self.internal_error.len()
            )?;
            if !self.not_found.is_empty() {
                write!(f, ", absent on {}", self.not_found.len())?;
            }
        } else {
            write!(
                f,
                "'{}' was not found on any of {} reachable node(s)",
                self.name,
                self.responded()
            )?;
        }

        if !self.unreachable.is_empty() {
            write!(f, ", {} node(s) unreachable", self.unreachable.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_status_text() {
        let outcome = UploadOutcome::Stored(UploadReport {
            name: "a.txt".into(),
            mode: UploadMode::ReplicateAll,
            accepted: vec![NodeId(1), NodeId(3)],
            attempted: 3,
            bytes: 2048,
            elapsed: Duration::from_millis(12),
        });
        assert_eq!(
            outcome.to_string(),
            "Uploaded 'a.txt' (2.00 KB) to 2 of 3 node(s) [1, 3] in 12 ms (high reliability)"
        );

        let failed = UploadOutcome::Failed(UploadFailure::NoNodesReachable {
            mode: UploadMode::LeastLoaded,
            elapsed: Duration::ZERO,
        });
        assert!(!failed.is_stored());
        assert!(failed.to_string().starts_with("Upload failed: no storage nodes reachable"));
    }

    #[test]
    fn test_delete_summary() {
        let mut report = DeleteReport::new("f");
        assert!(report.to_string().contains("no storage nodes reachable"));

        report.not_found.push(NodeId(2));
        assert_eq!(report.to_string(), "'f' was not found on any of 1 reachable node(s)");

        report.deleted.extend([NodeId(1), NodeId(3)]);
        report.unreachable.push(NodeId(4));
        assert_eq!(
            report.to_string(),
            "Deleted 'f' from 2 node(s), absent on 1, 1 node(s) unreachable"
        );
    }

    #[test]
    fn test_delete_summary_without_removals() {
        let mut absent = DeleteReport::new("f");
        absent.not_found.extend([NodeId(1), NodeId(2)]);
        absent.unreachable.push(NodeId(3));
        assert_eq!(
            absent.to_string(),
            "'f' was not found on any of 2 reachable node(s), 1 node(s) unreachable"
        );

        let mut failed = DeleteReport::new("f");
        failed.internal_error.extend([NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(failed.to_string(), "Delete failed: could not remove 'f' on 3 node(s)");

        failed.internal_error.pop();
        failed.unreachable.push(NodeId(3));
        assert_eq!(
            failed.to_string(),
            "Delete failed: could not remove 'f' on 2 node(s), 1 node(s) unreachable"
        );
    }
}
