//! `process`, `batch` and `check` commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use audittrack_config::AuditConfig;
use audittrack_pipeline::{export_report, open_repository, AuditPipeline, BatchInput, BatchProcessor};


use crate::terminal_output::{note_success, note_warn, outcome_label, render_table, status_label, Column};

fn document_name(path: &Path) -> String {
    BatchInput::from_path(path).document_name
}

pub async fn process(
    config: &AuditConfig,
    file: &Path,
    name: Option<String>,
    export: Option<&Path>,
) -> Result<()> {
    let repository = open_repository(&config.storage)?;
    let pipeline = AuditPipeline::from_config(config);
    let name = name.unwrap_or_else(|| document_name(file));

    let report = pipeline.process(file, &name).await?;
    let audit_id = repository.save(report.clone()).await?;
    note_success(&format!(
        "{name}: {} ({} issue(s)), stored as {audit_id}",
        outcome_label(report.outcome()),
        report.issue_count()
    ));

    if let Some(destination) = export {
        // The report is already stored; a failed export only loses the PDF.
        match export_report(&report, destination) {
            Ok(path) => note_success(&format!("PDF written to {}", path.display())),
            Err(e) => note_warn(&e.to_string()),
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "audit_id": audit_id, "report": report }))?
    );
    Ok(())
}

pub async fn batch(
    config: &AuditConfig,
    files: Vec<PathBuf>,
    max_concurrent: Option<usize>,
) -> Result<()> {
    let repository = open_repository(&config.storage)?;
    let pipeline = Arc::new(AuditPipeline::from_config(config));
    let processor = BatchProcessor::new(
        pipeline,
        repository,
        max_concurrent.unwrap_or(config.batch.max_concurrent),
    );

    let inputs = files.into_iter().map(BatchInput::from_path).collect();
    let summary = processor.process_batch(inputs).await;
    if summary.failed > 0 {
        note_warn(&format!("{} of {} document(s) failed", summary.failed, summary.processed));
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn check(config: &AuditConfig, file: &Path) -> Result<()> {
    let pipeline = AuditPipeline::from_config(config);
    let name = document_name(file);
    let check = pipeline.check(file, &name).await?;

    let rows: Vec<Vec<String>> = check
        .field_status
        .iter()
        .map(|(field, status)| vec![field.label().to_string(), status_label(status)])
        .collect();
    println!("{name}");
    println!(
        "  pages: {}  ocr: {}  characters: {}\n",
        check.extraction.page_count,
        if check.extraction.used_ocr { "yes" } else { "no" },
        check.extraction.text.chars().count()
    );
    print!("{}", render_table(&[Column::left("Field"), Column::left("Status")], &rows));
    println!(
        "\n  {} ({} issue(s))",
        outcome_label(check.field_status.outcome()),
        check.field_status.issue_count()
    );
    Ok(())
}
