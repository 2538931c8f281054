use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use super::{CatalogSource, ListKind};
use crate::transform::CatalogItem;

/// HTTP client for `GET /api/anime` on a running proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build proxy HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, query: &str) -> String {
        format!("{}/api/anime?{}", self.base_url, query)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Catalog endpoint returned error status");
            return Ok(None);
        }
        let parsed = res.json::<T>().await.context("JSON parse failed")?;
        Ok(Some(parsed))
    }
}

#[async_trait]
impl CatalogSource for ProxyClient {
    async fn list(&self, kind: ListKind) -> Result<Option<Vec<CatalogItem>>> {
        let url = self.endpoint(&format!("type={}", kind.as_str()));
        self.get_json(&url).await
    }

    async fn search(&self, query: &str) -> Vec<CatalogItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let url = self.endpoint(&format!("type=search&q={}", urlencoding::encode(query)));
        let result = self
            .get_json::<Vec<CatalogItem>>(&url)
            .await
            .and_then(|items| items.ok_or_else(|| anyhow!("search returned error status")));
        match result {
            Ok(items) => items,
            Err(e) => {
                error!("Search anime error: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn details(&self, id: u32) -> Option<CatalogItem> {
        let url = self.endpoint(&format!("type=details&id={id}"));
        let result = self
            .get_json::<CatalogItem>(&url)
            .await
            .and_then(|item| item.ok_or_else(|| anyhow!("details returned error status")));
        match result {
            Ok(item) => Some(item),
            Err(e) => {
                error!("Get anime details error: {:#}", e);
                None
            }
        }
    }
}
