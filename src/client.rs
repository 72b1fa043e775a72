//! Client for the coordinator's public API
//!
//! Losing the coordinator is the one failure a client cannot route around:
//! every transport error surfaces as [`Error::ConnectionFailed`].

use crate::common::{encode_name, Error, Result};
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSummary {
    pub id: u32,
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterStatus {
    pub num_nodes: usize,
    pub connected: usize,
    pub nodes: Vec<NodeSummary>,
}

pub struct CoordinatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, encode_name(name))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("coordinator {}: {}", self.base_url, e)))
    }

    async fn text(&self, resp: reqwest::Response) -> Result<String> {
        resp.text()
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))
    }

    /// Every file held by at least one reachable node, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let resp = self
            .send(self.client.get(format!("{}/files", self.base_url)))
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// `None` when no reachable node holds the file (or none is reachable)
    pub async fn download(&self, name: &str) -> Result<Option<Bytes>> {
        let resp = self.send(self.client.get(self.file_url(name))).await?;
        match resp.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("{}", self.text(resp).await?);
                Ok(None)
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                tracing::warn!("{}", self.text(resp).await?);
                Ok(None)
            }
            _ => {
                let resp = resp.error_for_status()?;
                Ok(Some(resp.bytes().await?))
            }
        }
    }

    /// Returns the coordinator's status message, success or not
    pub async fn upload(&self, name: &str, data: Bytes, high_reliability: bool) -> Result<String> {
        let resp = self
            .send(
                self.client
                    .put(self.file_url(name))
                    .query(&[("high_reliability", high_reliability)])
                    .body(data),
            )
            .await?;
        if resp.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Ok(format!("Upload failed: '{}' exceeds the size limit", name));
        }
        self.text(resp).await
    }

    pub async fn delete(&self, name: &str) -> Result<String> {
        let resp = self.send(self.client.delete(self.file_url(name))).await?;
        self.text(resp).await
    }

    pub async fn file_exists(&self, name: &str) -> Result<bool> {
        let resp = self
            .send(self.client.get(format!(
                "{}/exists/{}",
                self.base_url,
                encode_name(name)
            )))
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn status(&self) -> Result<ClusterStatus> {
        let resp = self
            .send(self.client.get(format!("{}/status", self.base_url)))
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}
