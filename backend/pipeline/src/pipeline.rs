//! Audit pipeline for a single document.
//!
//! extract -> check fields -> {LLM field extraction, compliance analysis}
//! -> synthesize. The two LLM stages only read the extracted text, so they
//! run concurrently, each under the call timeout. A stage that fails or
//! times out degrades to its error text; only extraction stops a document.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use audittrack_config::AuditConfig;
use audittrack_core::{
    AuditError, AuditReport, ComplianceResult, ExtractionResult, FieldExtraction, FieldStatusMap,
};
use audittrack_logging::{PipelineStage, StageEvent, StageOutcome};
use audittrack_memory::ComplianceAnalyzer;
use audittrack_planner::providers::provider_from_config;
use audittrack_planner::StructuredFieldExtractor;
use audittrack_report::{export_pdf, synthesize};
use audittrack_understanding::{check_fields, FieldRules, TextExtractor};
use serde::Serialize;
use tracing::info;

const EMPTY_TEXT_MESSAGE: &str = "No text could be extracted from the document";

/// Extraction plus presence checks, without any network call.
#[derive(Debug, Clone, Serialize)]
pub struct FieldCheck {
    pub extraction: ExtractionResult,
    pub field_status: FieldStatusMap,
}

pub struct AuditPipeline {
    extractor: TextExtractor,
    rules: FieldRules,
    fields: StructuredFieldExtractor,
    compliance: ComplianceAnalyzer,
    call_timeout: Duration,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Run `stage` under `limit`; on timeout produce the stage's error form.
async fn bounded<T>(
    limit: Duration,
    stage: impl Future<Output = T>,
    on_timeout: impl FnOnce(String) -> T,
) -> T {
    match tokio::time::timeout(limit, stage).await {
        Ok(value) => value,
        Err(_) => on_timeout(format!("timed out after {}s", limit.as_secs_f32())),
    }
}

impl AuditPipeline {
    pub fn new(
        extractor: TextExtractor,
        rules: FieldRules,
        fields: StructuredFieldExtractor,
        compliance: ComplianceAnalyzer,
    ) -> Self {
        Self {
            extractor,
            rules,
            fields,
            compliance,
            call_timeout: Duration::from_secs(120),
        }
    }

    /// Production wiring: lopdf + tesseract, OpenAI chat, OpenAI embeddings + Pinecone.
    pub fn from_config(config: &AuditConfig) -> Self {
        let provider = provider_from_config(&config.llm);
        Self::new(
            TextExtractor::from_config(&config.ocr),
            FieldRules::from_config(&config.fields),
            StructuredFieldExtractor::from_config(provider.clone(), config),
            ComplianceAnalyzer::from_config(provider, config),
        )
        .with_call_timeout(Duration::from_secs(config.analysis.call_timeout_secs))
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    async fn extract(&self, path: &Path, document_name: &str) -> Result<ExtractionResult, AuditError> {
        let start = Instant::now();
        let result = self.extractor.extract(path).await.and_then(|extraction| {
            if extraction.has_text() {
                Ok(extraction)
            } else {
                Err(AuditError::Extraction(EMPTY_TEXT_MESSAGE.to_string()))
            }
        });
        let outcome = match &result {
            Ok(_) => StageOutcome::Ok,
            Err(e) => StageOutcome::Failed { reason: e.to_string() },
        };
        StageEvent::new(document_name, PipelineStage::Extraction, outcome, elapsed_ms(start)).log();
        result
    }

    /// Extract and check fields only.
    pub async fn check(&self, path: &Path, document_name: &str) -> Result<FieldCheck, AuditError> {
        let extraction = self.extract(path, document_name).await?;
        let start = Instant::now();
        let field_status = check_fields(&extraction.text, &self.rules);
        StageEvent::new(document_name, PipelineStage::FieldCheck, StageOutcome::Ok, elapsed_ms(start)).log();
        Ok(FieldCheck {
            extraction,
            field_status,
        })
    }

    async fn extract_fields(&self, text: &str, document_name: &str) -> FieldExtraction {
        let start = Instant::now();
        let result = bounded(self.call_timeout, self.fields.extract_fields(text), |msg| {
            FieldExtraction::failed(msg)
        })
        .await;
        let outcome = match &result {
            FieldExtraction::Failed { message } => StageOutcome::Degraded { reason: message.clone() },
            FieldExtraction::Extracted { .. } => StageOutcome::Ok,
        };
        StageEvent::new(document_name, PipelineStage::FieldExtraction, outcome, elapsed_ms(start)).log();
        result
    }

    async fn analyze_compliance(&self, text: &str, document_name: &str) -> ComplianceResult {
        let start = Instant::now();
        let result = bounded(self.call_timeout, self.compliance.analyze(text), |msg| {
            ComplianceResult::failed(msg)
        })
        .await;
        let outcome = if result.is_failed() {
            StageOutcome::Degraded {
                reason: result.narrative.clone().unwrap_or_default(),
            }
        } else {
            StageOutcome::Ok
        };
        StageEvent::new(document_name, PipelineStage::Compliance, outcome, elapsed_ms(start)).log();
        result
    }

    /// Run one document end to end.
    pub async fn process(&self, path: &Path, document_name: &str) -> Result<AuditReport, AuditError> {
        info!(document = document_name, path = %path.display(), "Processing document");
        let FieldCheck {
            extraction,
            field_status,
        } = self.check(path, document_name).await?;

        let (gpt_fields, compliance) = tokio::join!(
            self.extract_fields(&extraction.text, document_name),
            self.analyze_compliance(&extraction.text, document_name),
        );

        let start = Instant::now();
        let report = AuditReport {
            used_ocr: extraction.used_ocr,
            ..synthesize(document_name, field_status, compliance, gpt_fields)
        };
        StageEvent::new(document_name, PipelineStage::Synthesis, StageOutcome::Ok, elapsed_ms(start)).log();
        info!(
            document = document_name,
            outcome = %report.outcome(),
            issues = report.issue_count(),
            used_ocr = report.used_ocr,
            "Document processed"
        );
        Ok(report)
    }
}

/// Write `report` as a PDF and record the export stage.
pub fn export_report(report: &AuditReport, destination: &Path) -> Result<PathBuf, AuditError> {
    let start = Instant::now();
    let result = export_pdf(report, destination);
    let outcome = match &result {
        Ok(_) => StageOutcome::Ok,
        Err(e) => StageOutcome::Failed { reason: e.to_string() },
    };
    StageEvent::new(&report.document_name, PipelineStage::Export, outcome, elapsed_ms(start)).log();
    result
}
