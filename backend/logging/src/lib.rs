//! Structured logging for AuditTrack.
//!
//! Console + rolling NDJSON file output, secret redaction, and per-stage
//! pipeline events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{PipelineStage, StageEvent, StageOutcome};
pub use logger::{init_logger, LogSettings};
pub use redact::redact_sensitive_data;
