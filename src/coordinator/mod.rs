//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - Node connectivity (lazy lookup, disconnect on failure)
//! - Reads with failover across a randomly started ring
//! - Write placement (replicate-all or least-loaded)
//! - Best-effort deletes and existence checks

pub mod handle;
pub mod http;
pub mod node_client;
pub mod outcome;
pub mod pool;
pub mod server;
pub mod service;

pub use handle::{ConnectionState, NodeHandle, NodeStatus};
pub use outcome::{
    DeleteReport, ReadOutcome, UploadFailure, UploadMode, UploadOutcome, UploadReport,
};
pub use pool::NodePool;
pub use server::CoordinatorServer;
pub use service::Coordinator;
