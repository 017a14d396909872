use thiserror::Error;

/// Top-level error type for the AuditTrack pipeline.
///
/// Only `Extraction` and `UnsupportedFormat` stop a document. LLM and
/// knowledge-base failures never surface here: the analysis stages fold
/// them into the report as embedded error strings.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("report export failed: {0}")]
    Export(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuditError {
    /// True when the document itself is the problem, as opposed to the
    /// store or the runtime around it.
    pub fn halts_document(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::Extraction(_))
    }
}
