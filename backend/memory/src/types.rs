use audittrack_core::SourceDocument;
use serde::{Deserialize, Serialize};

/// Metadata key holding an entry's text, as written by the ingestion job.
pub const TEXT_METADATA_KEY: &str = "text";

/// A knowledge-base entry with its embedding (in-memory index only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    /// Embedding of `metadata.text`
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl IndexMatch {
    /// Split the entry text out of the metadata. Entries without a `text`
    /// key keep `page_content: None`.
    pub fn into_source(self) -> SourceDocument {
        let mut metadata = self.metadata;
        let page_content = metadata
            .as_object_mut()
            .and_then(|m| m.remove(TEXT_METADATA_KEY))
            .and_then(|v| v.as_str().map(str::to_string));
        SourceDocument {
            page_content,
            metadata,
            score: Some(self.score),
        }
    }
}
