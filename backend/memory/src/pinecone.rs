//! Pinecone data-plane client.
//!
//! Only the query path is implemented: the knowledge base is built and
//! maintained by a separate ingestion job.

use anyhow::{Context, Result};
use async_trait::async_trait;
use audittrack_config::KnowledgeBaseConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::store::VectorIndex;
use crate::types::IndexMatch;

const API_VERSION: &str = "2024-07";

pub struct PineconeIndex {
    client: Client,
    api_key: Option<String>,
    index_name: String,
    control_plane_url: String,
    host: OnceCell<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

/// `abc.svc.pinecone.io` -> `https://abc.svc.pinecone.io`; explicit schemes are kept.
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

impl PineconeIndex {
    pub fn new(api_key: Option<String>, index_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            index_name: index_name.into(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            host: OnceCell::new(),
        }
    }

    pub fn from_config(config: &KnowledgeBaseConfig) -> Self {
        let mut index = Self::new(config.api_key.clone(), &config.index_name);
        index.control_plane_url = config.control_plane_url.trim_end_matches('/').to_string();
        if let Some(host) = &config.index_host {
            index = index.with_host(host);
        }
        index
    }

    /// Skip control-plane host resolution.
    pub fn with_host(self, host: &str) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(base_url(host));
        Self { host: cell, ..self }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().context("PINECONE_API_KEY is not set")
    }

    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", self.control_plane_url, self.index_name);
                info!(index = %self.index_name, "Resolving Pinecone index host");
                let response = self
                    .client
                    .get(&url)
                    .header("Api-Key", self.api_key()?)
                    .header("X-Pinecone-API-Version", API_VERSION)
                    .send()
                    .await
                    .context("Pinecone control plane request failed")?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!(
                        "Pinecone index '{}' lookup returned {}: {}",
                        self.index_name,
                        status,
                        body
                    );
                }
                let described: DescribeIndexResponse = response
                    .json()
                    .await
                    .context("Failed to parse Pinecone index description")?;
                Ok::<_, anyhow::Error>(base_url(&described.host))
            })
            .await?;
        Ok(host.as_str())
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.index_name
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let api_key = self.api_key()?;
        let host = self.host().await?;
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };
        debug!(index = %self.index_name, top_k, "Querying Pinecone");

        let response = self
            .client
            .post(format!("{host}/query"))
            .header("Api-Key", api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("Pinecone query request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone returned {}: {}", status, error_body);
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .context("Failed to parse Pinecone query response")?;
        Ok(parsed.matches)
    }
}
