/// Embedding providers for the regulatory knowledge base.
///
/// Queries must be embedded with the same model and dimension the index was
/// built with (`text-embedding-3-small` at 1024 dimensions by default).
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Return the embedding dimension for this provider/model.
    fn dimension(&self) -> usize;
    /// Embed a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct OpenAIEmbeddings {
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimensions: Option<u32>,
    client: Client,
}

impl OpenAIEmbeddings {
    pub fn new(api_key: Option<String>, model: impl Into<String>, dimensions: Option<u32>) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            dimensions,
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = url.as_ref().trim_end_matches('/').to_string();
        self
    }

    fn request<'a>(&'a self, text: &'a str) -> OpenAIEmbedRequest<'a> {
        OpenAIEmbedRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        }
    }
}

#[derive(Serialize)]
struct OpenAIEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Deserialize)]
struct OpenAIEmbedResponse {
    data: Vec<OpenAIEmbedData>,
}

#[derive(Deserialize)]
struct OpenAIEmbedData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn dimension(&self) -> usize {
        match self.dimensions {
            Some(d) => d as usize,
            None if self.model.contains("3-large") => 3072,
            None => 1536,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.api_key.as_deref().context("OPENAI_API_KEY is not set")?;
        debug!(model = %self.model, chars = text.len(), "Embedding query");

        let res: OpenAIEmbedResponse = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&self.request(text))
            .send()
            .await
            .context("OpenAI embeddings request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse OpenAI embeddings response")?;
        res.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("Empty OpenAI embedding response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_dimensions() {
        let provider = OpenAIEmbeddings::new(None, "text-embedding-3-small", Some(1024));
        let body = serde_json::to_value(provider.request("query")).unwrap();
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["dimensions"], 1024);
        assert_eq!(provider.dimension(), 1024);
    }

    #[test]
    fn native_dimension_without_override() {
        let small = OpenAIEmbeddings::new(None, "text-embedding-3-small", None);
        let large = OpenAIEmbeddings::new(None, "text-embedding-3-large", None);
        assert_eq!(small.dimension(), 1536);
        assert_eq!(large.dimension(), 3072);
        assert!(serde_json::to_value(small.request("q")).unwrap().get("dimensions").is_none());
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let provider = OpenAIEmbeddings::new(None, "text-embedding-3-small", Some(1024));
        let err = provider.embed("query").await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
