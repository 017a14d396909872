//! Pipeline stage events
//!
//! One structured event per pipeline stage and document, written through
//! `tracing` under the `audit_events` target so file logs can be filtered.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extraction,
    FieldCheck,
    FieldExtraction,
    Compliance,
    Synthesis,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Ok,
    /// The stage produced an error placeholder but the document continues.
    Degraded { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StageEvent {
    pub document: String,
    pub stage: PipelineStage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl StageEvent {
    pub fn new(
        document: impl Into<String>,
        stage: PipelineStage,
        outcome: StageOutcome,
        duration_ms: u64,
    ) -> Self {
        let outcome = match outcome {
            StageOutcome::Degraded { reason } => StageOutcome::Degraded {
                reason: redact_sensitive_data(&reason),
            },
            StageOutcome::Failed { reason } => StageOutcome::Failed {
                reason: redact_sensitive_data(&reason),
            },
            ok => ok,
        };
        Self {
            document: document.into(),
            stage,
            outcome,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Emit the event; non-ok outcomes log at warn level.
    pub fn log(&self) {
        let payload = serde_json::to_string(self).unwrap_or_default();
        match self.outcome {
            StageOutcome::Ok => {
                info!(target: "audit_events", stage = ?self.stage, document = %self.document, event = %payload, "Stage finished")
            }
            _ => {
                warn!(target: "audit_events", stage = ?self.stage, document = %self.document, event = %payload, "Stage did not complete cleanly")
            }
        }
    }
}
