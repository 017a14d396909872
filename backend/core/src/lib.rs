pub mod error;
pub mod retry;
pub mod text;
pub mod traits;
pub mod types;

pub use error::AuditError;
pub use retry::RetryPolicy;
pub use text::{document_prefix, DEFAULT_MAX_INPUT_CHARS};
pub use traits::{LlmProvider, LlmRequest, LlmResponse};
pub use types::{
    AuditField, AuditOutcome, AuditReport, ComplianceResult, ExtractionResult, FieldExtraction,
    FieldStatus, FieldStatusMap, HistoryEntry, SourceDocument, StoredReport,
};
