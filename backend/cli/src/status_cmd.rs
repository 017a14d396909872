//! CLI Status Command
//!
//! Reports the effective config (secrets masked), OCR tool availability and
//! the number of stored reports.

use anyhow::Result;
use serde_json::json;

use audittrack_config::AuditConfig;
use audittrack_pipeline::open_repository;
use audittrack_understanding::TesseractOcr;

use crate::terminal_output::note_warn;

pub async fn run(config: &AuditConfig) -> Result<()> {
    let tools = TesseractOcr::new(config.ocr.clone()).check_tools().await;
    for tool in tools.iter().filter(|t| !t.available) {
        note_warn(&format!("{} not found; scanned PDFs cannot be processed", tool.program));
    }

    let reports = match open_repository(&config.storage) {
        Ok(repo) => json!(repo.count().await?),
        Err(e) => json!({ "error": e.to_string() }),
    };

    let status = json!({
        "config": config.redacted(),
        "ocrTools": tools.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
        "storedReports": reports,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
