//! Local file tree backing a storage node
//!
//! One root directory per node; file names may contain `/` to address
//! sub-directories. Local I/O failures are reported through the contract's
//! negative results and logged, never returned as errors.

use crate::common::{resolve_under, Result};
use crate::node::rpc::{DeleteOutcome, NodeError, NodeId, StorageNode};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct FileStore {
    id: NodeId,
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating `root` if it does not exist yet
    pub async fn open(id: NodeId, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if tokio::fs::metadata(&root).await.is_err() {
            info!("Base directory {} does not exist, creating it", root.display());
        }
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { id, root })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and collect regular files relative to the root
    async fn walk(&self) -> std::io::Result<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Some(name) = self.relative_name(&path) {
                        files.push(name);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn relative_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        match resolve_under(&self.root, name) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(node = %self.id, "Rejected file name: {}", e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageNode for FileStore {
    async fn list(&self) -> std::result::Result<Vec<String>, NodeError> {
        debug!(node = %self.id, "Received request to obtain listings");
        match self.walk().await {
            Ok(files) => Ok(files),
            Err(e) => {
                warn!(node = %self.id, "Could not find file listings: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn download(&self, name: &str) -> std::result::Result<Option<Bytes>, NodeError> {
        debug!(node = %self.id, name, "Received request to download");
        let Some(path) = self.path_for(name) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(node = %self.id, name, "File does not exist on this node");
                Ok(None)
            }
            Err(e) => {
                warn!(node = %self.id, "Could not read {} from disk: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn upload(&self, name: &str, data: Bytes) -> std::result::Result<bool, NodeError> {
        debug!(node = %self.id, name, size = data.len(), "Received request to upload");
        let Some(path) = self.path_for(name) else {
            return Ok(false);
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(node = %self.id, "Could not create {}: {}", parent.display(), e);
                return Ok(false);
            }
        }

        match tokio::fs::write(&path, &data).await {
            Ok(()) => {
                debug!(node = %self.id, name, "File saved to disk");
                Ok(true)
            }
            Err(e) => {
                warn!(node = %self.id, "Error writing {} to disk: {}", path.display(), e);
                Ok(false)
            }
        }
    }

    async fn delete(&self, name: &str) -> std::result::Result<DeleteOutcome, NodeError> {
        debug!(node = %self.id, name, "Received request to delete");
        let Some(path) = self.path_for(name) else {
            return Ok(DeleteOutcome::InternalError);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => {
                warn!(node = %self.id, "Error deleting {}: {}", path.display(), e);
                Ok(DeleteOutcome::InternalError)
            }
        }
    }

    async fn file_exists(&self, name: &str) -> std::result::Result<bool, NodeError> {
        let Some(path) = self.path_for(name) else {
            return Ok(false);
        };
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }
}
