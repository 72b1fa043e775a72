//! HTTP client for one storage node

use crate::common::encode_name;
use crate::node::http::UploadResponse;
use crate::node::{DeleteOutcome, NodeError, NodeId, StorageNode};
use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

pub struct HttpNodeClient {
    id: NodeId,
    base_url: String,
    client: reqwest::Client,
}

impl HttpNodeClient {
    /// The client's own timeout bounds every call.
    pub fn new(id: NodeId, base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            id,
            base_url,
            client,
        }
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, encode_name(name))
    }

    fn transport_error(&self, e: reqwest::Error) -> NodeError {
        if e.is_timeout() {
            NodeError::Timeout(format!("node {}: {}", self.id, e))
        } else if e.is_decode() {
            NodeError::Protocol(format!("node {}: {}", self.id, e))
        } else {
            NodeError::Unreachable(format!("node {}: {}", self.id, e))
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, NodeError> {
        request.send().await.map_err(|e| self.transport_error(e))
    }

    async fn expect_json<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, NodeError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(NodeError::Protocol(format!(
                "node {} answered {}",
                self.id, status
            )));
        }
        resp.json::<T>().await.map_err(|e| self.transport_error(e))
    }
}

#[async_trait::async_trait]
impl StorageNode for HttpNodeClient {
    async fn list(&self) -> Result<Vec<String>, NodeError> {
        let resp = self
            .send(self.client.get(format!("{}/files", self.base_url)))
            .await?;
        self.expect_json(resp).await
    }

    async fn download(&self, name: &str) -> Result<Option<Bytes>, NodeError> {
        let resp = self.send(self.client.get(self.file_url(name))).await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => resp
                .bytes()
                .await
                .map(Some)
                .map_err(|e| self.transport_error(e)),
            s => Err(NodeError::Protocol(format!(
                "node {} answered {}",
                self.id, s
            ))),
        }
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<bool, NodeError> {
        let resp = self
            .send(self.client.put(self.file_url(name)).body(data))
            .await?;
        if resp.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Ok(false);
        }
        Ok(self.expect_json::<UploadResponse>(resp).await?.ok)
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, NodeError> {
        let resp = self.send(self.client.delete(self.file_url(name))).await?;
        self.expect_json(resp).await
    }

    async fn file_exists(&self, name: &str) -> Result<bool, NodeError> {
        let resp = self
            .send(self.client.get(format!(
                "{}/exists/{}",
                self.base_url,
                encode_name(name)
            )))
            .await?;
        self.expect_json(resp).await
    }
}
