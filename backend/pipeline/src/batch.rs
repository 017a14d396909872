//! Bounded batch processing.
//!
//! Every document runs on its own task, but at most `max_concurrent` are
//! past the semaphore at once. A failing or panicking document is reported
//! as failed and never stops the others.

use std::path::PathBuf;
use std::sync::Arc;

use audittrack_core::AuditError;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::AuditPipeline;
use crate::store::ReportRepository;

#[derive(Debug, Clone)]
pub struct BatchInput {
    pub path: PathBuf,
    /// Name shown in the report; defaults to the file name.
    pub document_name: String,
}

impl BatchInput {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            document_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn failed(filename: String, error: impl ToString) -> Self {
        Self {
            filename,
            success: false,
            audit_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Per-document outcomes in input order, plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

pub struct BatchProcessor {
    pipeline: Arc<AuditPipeline>,
    repository: Arc<dyn ReportRepository>,
    max_concurrent: usize,
}

impl BatchProcessor {
    pub fn new(
        pipeline: Arc<AuditPipeline>,
        repository: Arc<dyn ReportRepository>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            pipeline,
            repository,
            max_concurrent: max_concurrent.max(1),
        }
    }

    async fn run_one(
        pipeline: &AuditPipeline,
        repository: &dyn ReportRepository,
        input: &BatchInput,
    ) -> Result<Uuid, AuditError> {
        let report = pipeline.process(&input.path, &input.document_name).await?;
        repository.save(report).await
    }

    pub async fn process_batch(&self, inputs: Vec<BatchInput>) -> BatchSummary {
        info!(documents = inputs.len(), max_concurrent = self.max_concurrent, "Starting batch");
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let semaphore = semaphore.clone();
                let pipeline = self.pipeline.clone();
                let repository = self.repository.clone();
                let filename = input.document_name.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| AuditError::Other(e.into()))?;
                    Self::run_one(&pipeline, repository.as_ref(), &input).await
                });
                (filename, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (filename, handle) in handles {
            let item = match handle.await {
                Ok(Ok(id)) => BatchItem {
                    filename,
                    success: true,
                    audit_id: Some(id),
                    error: None,
                },
                Ok(Err(e)) if e.halts_document() => {
                    warn!(document = %filename, error = %e, "Document rejected");
                    BatchItem::failed(filename, e)
                }
                Ok(Err(e)) => {
                    error!(document = %filename, error = %e, "Document failed outside the pipeline");
                    BatchItem::failed(filename, e)
                }
                Err(join_err) => {
                    warn!(document = %filename, error = %join_err, "Document task aborted");
                    BatchItem::failed(filename, format!("processing task aborted: {join_err}"))
                }
            };
            results.push(item);
        }

        let successful = results.iter().filter(|r| r.success).count();
        let summary = BatchSummary {
            processed: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        };
        info!(
            processed = summary.processed,
            successful = summary.successful,
            failed = summary.failed,
            "Batch complete"
        );
        summary
    }
}
