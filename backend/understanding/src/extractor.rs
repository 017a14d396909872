//! Text extraction with OCR fallback.
//!
//! The native text layer is tried first. Only when it yields nothing but
//! whitespace (or cannot be read at all) are the pages OCR'd.

use std::path::Path;
use std::sync::Arc;

use audittrack_config::OcrConfig;
use audittrack_core::{AuditError, ExtractionResult};
use tracing::{info, warn};

use crate::doc_parse::{LopdfTextSource, NativeTextSource};
use crate::ocr::{OcrEngine, TesseractOcr};

/// The only format the extractor understands.
pub const SUPPORTED_EXTENSION: &str = "pdf";

/// Rejects anything that is not a `.pdf` (case-insensitive).
pub fn ensure_supported(path: &Path) -> Result<(), AuditError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some(SUPPORTED_EXTENSION) => Ok(()),
        Some(other) => Err(AuditError::UnsupportedFormat(format!(".{other}"))),
        None => Err(AuditError::UnsupportedFormat(path.display().to_string())),
    }
}

#[derive(Clone)]
pub struct TextExtractor {
    native: Arc<dyn NativeTextSource>,
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(native: Arc<dyn NativeTextSource>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { native, ocr }
    }

    /// lopdf for the text layer, pdftoppm + tesseract for the fallback.
    pub fn from_config(ocr: &OcrConfig) -> Self {
        Self::new(
            Arc::new(LopdfTextSource::new()),
            Arc::new(TesseractOcr::new(ocr.clone())),
        )
    }

    pub async fn extract(&self, path: &Path) -> Result<ExtractionResult, AuditError> {
        ensure_supported(path)?;

        info!(path = %path.display(), "Attempting direct text extraction");
        let (text, page_count) = match self.native.page_texts(path).await {
            Ok(pages) => (pages.concat(), pages.len()),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Direct text extraction failed");
                (String::new(), 0)
            }
        };

        if !text.trim().is_empty() {
            info!(chars = text.chars().count(), pages = page_count, "Text extraction complete");
            return Ok(ExtractionResult {
                text,
                used_ocr: false,
                page_count,
            });
        }

        info!(path = %path.display(), "Falling back to OCR processing");
        let pages = self
            .ocr
            .recognize_pages(path)
            .await
            .map_err(|e| AuditError::Extraction(format!("{e:#}")))?;

        let mut text = String::new();
        for page in &pages {
            text.push_str(page);
            text.push('\n');
        }
        info!(chars = text.chars().count(), pages = pages.len(), "OCR extraction complete");
        Ok(ExtractionResult {
            text,
            used_ocr: true,
            page_count: pages.len(),
        })
    }
}
