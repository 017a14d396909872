//! `history`, `show` and `export` commands over the report store.

use std::path::PathBuf;

use anyhow::{bail, Result};
use uuid::Uuid;

use audittrack_config::AuditConfig;
use audittrack_pipeline::{export_report, open_repository};


use crate::terminal_output::{note_info, note_success, outcome_label, render_table, Column};

pub async fn history(config: &AuditConfig, limit: usize) -> Result<()> {
    let repository = open_repository(&config.storage)?;
    let entries = repository.history(limit).await?;
    if entries.is_empty() {
        note_info("No reports stored yet");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.document_name.clone(),
                outcome_label(e.outcome),
                e.issues.to_string(),
                e.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(
            &[
                Column::left("ID"),
                Column::left("Document"),
                Column::left("Status"),
                Column::right("Issues"),
                Column::left("Processed"),
            ],
            &rows,
        )
    );
    Ok(())
}

pub async fn show(config: &AuditConfig, id: Uuid) -> Result<()> {
    let repository = open_repository(&config.storage)?;
    let Some(stored) = repository.get(id).await? else {
        bail!("No report with id {id}");
    };
    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}

pub async fn export(config: &AuditConfig, id: Uuid, out: Option<PathBuf>) -> Result<()> {
    let repository = open_repository(&config.storage)?;
    let Some(stored) = repository.get(id).await? else {
        bail!("No report with id {id}");
    };
    let destination = out.unwrap_or_else(|| PathBuf::from(format!("audit_report_{id}.pdf")));
    let path = export_report(&stored.report, &destination)?;
    note_success(&format!("PDF written to {}", path.display()));
    Ok(())
}
