//! Client for a registry served over HTTP

use crate::common::{encode_name, Error, Result};
use crate::discovery::registry::Binding;
use crate::discovery::NameService;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

pub struct RemoteNameService {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteNameService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, name: &str) -> String {
        format!("{}/registry/{}", self.base_url, encode_name(name))
    }

    pub async fn rebind(&self, name: &str, address: &str) -> Result<()> {
        let resp = self
            .client
            .put(self.url(name))
            .json(&json!({ "address": address }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Registry(format!(
                "rebind {} failed with {}",
                name,
                resp.status()
            )));
        }
        Ok(())
    }

    pub async fn unbind(&self, name: &str) -> Result<()> {
        let resp = self.client.delete(self.url(name)).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotBound(name.to_string())),
            s => Err(Error::Registry(format!("unbind {} failed with {}", name, s))),
        }
    }

    pub async fn bindings(&self) -> Result<BTreeMap<String, String>> {
        #[derive(serde::Deserialize)]
        struct Listing {
            bindings: BTreeMap<String, String>,
        }

        let listing: Listing = self
            .client
            .get(format!("{}/registry", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.bindings)
    }
}

#[async_trait::async_trait]
impl NameService for RemoteNameService {
    async fn resolve(&self, name: &str) -> Result<String> {
        let resp = self.client.get(self.url(name)).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(Error::NotBound(name.to_string())),
            s if s.is_success() => Ok(resp.json::<Binding>().await?.address),
            s => Err(Error::Registry(format!("resolve {} failed with {}", name, s))),
        }
    }
}
