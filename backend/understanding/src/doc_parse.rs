//! Native PDF text layer
//!
//! Reads the text objects of each page with lopdf. Scanned documents have no
//! text objects and come back as empty pages, which sends the extractor to
//! the OCR fallback.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use lopdf::Document;
use tracing::{debug, warn};

/// Source of a document's embedded (non-OCR) text.
#[async_trait]
pub trait NativeTextSource: Send + Sync {
    /// Text of every page, in document order. Empty strings for pages
    /// without a text layer.
    async fn page_texts(&self, path: &Path) -> Result<Vec<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextSource;

impl LopdfTextSource {
    pub fn new() -> Self {
        Self
    }

    /// Blocking read of all page texts.
    pub fn read_pages(path: &Path) -> Result<Vec<String>> {
        let doc = Document::load(path)
            .with_context(|| format!("Failed to load PDF {}", path.display()))?;

        // get_pages is keyed by 1-based page number, so iteration is document order.
        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    warn!(page = page_num, error = %e, "Page text unreadable, treating as empty");
                    texts.push(String::new());
                }
            }
        }
        debug!(path = %path.display(), pages = texts.len(), "Native text layer read");
        Ok(texts)
    }
}

#[async_trait]
impl NativeTextSource for LopdfTextSource {
    async fn page_texts(&self, path: &Path) -> Result<Vec<String>> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_pages(&path))
            .await
            .context("PDF parsing task panicked")?
    }
}
