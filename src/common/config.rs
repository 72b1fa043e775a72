//! Configuration for minifs components

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default config file, overridable with `MINIFS_CONFIG`.
pub const DEFAULT_CONFIG_FILE: &str = "minifs.toml";

/// Prefix every storage node publishes its id under in the registry.
pub const DEFAULT_NAME_PREFIX: &str = "FileServer";

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<CoordinatorConfig>,

    /// Storage node config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the optional TOML file, then `MINIFS__*`
    /// environment variables (`MINIFS__COORDINATOR__NUM_NODES=5`).
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("MINIFS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MINIFS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut loaded: Config = settings.try_deserialize()?;
        if loaded.log_level.is_empty() {
            loaded.log_level = default_log_level();
        }
        Ok(loaded)
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Bind address for the client-facing API and the registry
    pub bind_addr: SocketAddr,

    /// Size of the node pool, fixed for the deployment
    pub num_nodes: u32,

    /// Upper bound for a single node RPC
    pub call_timeout_ms: u64,

    /// Largest accepted upload body
    pub max_file_size: u64,

    /// Registry name prefix; node `id` is published as `{prefix}{id}`
    pub name_prefix: String,

    /// Statically bound names (`FileServer1 = "http://10.0.0.1:6001"`).
    /// Names missing here are expected to register themselves.
    pub nodes: BTreeMap<String, String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            num_nodes: 3,
            call_timeout_ms: 5_000,
            max_file_size: 64 * 1024 * 1024,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            nodes: BTreeMap::new(),
        }
    }
}

impl CoordinatorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_nodes == 0 {
            return Err(Error::InvalidConfig("num_nodes must be at least 1".into()));
        }
        if self.call_timeout_ms == 0 {
            return Err(Error::InvalidConfig("call_timeout_ms must be positive".into()));
        }
        if self.name_prefix.is_empty() {
            return Err(Error::InvalidConfig("name_prefix must not be empty".into()));
        }
        Ok(())
    }
}

/// Storage node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node id in `1..=N`
    pub id: u32,

    /// Bind address for the node RPC surface; `127.0.0.1:{6000 + id}` if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<SocketAddr>,

    /// Address published to the registry; derived from `bind_addr` if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,

    /// Root directory; `./server_files_{id}` if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Registry the node binds its name in
    pub registry_url: String,

    pub name_prefix: String,

    pub max_file_size: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::for_id(1)
    }
}

impl NodeConfig {
    pub fn for_id(id: u32) -> Self {
        Self {
            id,
            bind_addr: None,
            advertise_addr: None,
            data_dir: None,
            registry_url: "http://127.0.0.1:5000".to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            max_file_size: 64 * 1024 * 1024,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr.unwrap_or_else(|| {
            let port = 6000u16.saturating_add(self.id.min(u16::MAX as u32) as u16);
            SocketAddr::from(([127, 0, 0, 1], port))
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("./server_files_{}", self.id)))
    }

    pub fn advertise_url(&self) -> String {
        match &self.advertise_addr {
            Some(addr) if addr.starts_with("http://") || addr.starts_with("https://") => {
                addr.clone()
            }
            Some(addr) => format!("http://{}", addr),
            None => format!("http://{}", self.bind_addr()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(Error::InvalidConfig("node id must be in 1..=N".into()));
        }
        Ok(())
    }
}
