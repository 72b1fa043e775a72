//! Common utilities and types shared across minifs

pub mod config;
pub mod error;
pub mod metrics;
pub mod tracing_middleware;
pub mod utils;

pub use config::{Config, CoordinatorConfig, NodeConfig};
pub use error::{Error, Result};
pub use metrics::METRICS;
pub use utils::{encode_name, format_bytes, resolve_under, retry_with_backoff};
