//! Retrieval QA, "stuff" style.
//!
//! Embed the question, fetch the nearest knowledge-base entries, put all of
//! their text into one prompt, and let the chat model answer.

use std::sync::Arc;

use anyhow::{Context, Result};
use audittrack_core::{LlmProvider, LlmRequest, SourceDocument};
use tracing::{debug, info};

use crate::embeddings::EmbeddingProvider;
use crate::store::VectorIndex;

const SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
----------------
";

/// Answer plus the entries it was grounded on, in retrieval order.
#[derive(Debug, Clone)]
pub struct RetrievalAnswer {
    pub answer: String,
    pub sources: Vec<SourceDocument>,
}

pub struct RetrievalQa {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    model: String,
    top_k: usize,
    max_tokens: Option<u32>,
}

/// System prompt with every retrieved snippet stuffed in.
pub fn stuff_context(sources: &[SourceDocument]) -> String {
    let context = sources
        .iter()
        .filter_map(|s| s.page_content.as_deref())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{SYSTEM_TEMPLATE}{context}")
}

impl RetrievalQa {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            model: model.into(),
            top_k: 3,
            max_tokens: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn ask(&self, question: &str) -> Result<RetrievalAnswer> {
        let vector = self
            .embedder
            .embed(question)
            .await
            .context("Embedding the query failed")?;

        let matches = self
            .index
            .query(&vector, self.top_k)
            .await
            .with_context(|| format!("Querying index '{}' failed", self.index.name()))?;
        debug!(index = self.index.name(), hits = matches.len(), "Knowledge base retrieval done");

        let sources: Vec<SourceDocument> = matches.into_iter().map(|m| m.into_source()).collect();

        let mut request = LlmRequest::deterministic(&self.model, question);
        request.system_prompt = Some(stuff_context(&sources));
        request.max_tokens = self.max_tokens;

        let response = self
            .llm
            .complete(&request)
            .await
            .context("Answering over retrieved context failed")?;
        info!(model = %self.model, sources = sources.len(), tokens = response.tokens_used, "Retrieval QA answered");

        Ok(RetrievalAnswer {
            answer: response.content,
            sources,
        })
    }
}
