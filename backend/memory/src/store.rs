use std::cmp::Ordering;
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::types::{IndexMatch, KnowledgeEntry};

/// Nearest-neighbour lookup over the knowledge base.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Index name used in logs.
    fn name(&self) -> &str;

    /// The `top_k` entries closest to `vector`, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;
}

/// Brute-force cosine similarity index. Used as the test double for the
/// knowledge base; production wiring always goes through Pinecone.
pub struct InMemoryVectorIndex {
    name: String,
    entries: RwLock<Vec<KnowledgeEntry>>,
}

impl InMemoryVectorIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace an entry by id.
    pub fn upsert(&self, entry: KnowledgeEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("knowledge index lock poisoned"))?;
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cosine_similarity(v1: &[f32], v2: &[f32]) -> f32 {
        if v1.len() != v2.len() {
            return 0.0;
        }

        let dot_product: f32 = v1.iter().zip(v2.iter()).map(|(a, b)| a * b).sum();
        let norm_a: f32 = v1.iter().map(|a| a * a).sum::<f32>().sqrt();
        let norm_b: f32 = v2.iter().map(|b| b * b).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("knowledge index lock poisoned"))?;
        let mut results: Vec<IndexMatch> = entries
            .iter()
            .map(|entry| IndexMatch {
                id: entry.id.clone(),
                score: Self::cosine_similarity(vector, &entry.vector),
                metadata: entry.metadata.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }
}
