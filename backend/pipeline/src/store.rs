//! Report repository.
//!
//! Finished reports are kept under a generated id. The repository is
//! injected into whatever needs it; nothing here is process-global.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use audittrack_config::StorageConfig;
use audittrack_core::{AuditError, AuditReport, HistoryEntry, StoredReport};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Store a report under a fresh id.
    async fn save(&self, report: AuditReport) -> Result<Uuid, AuditError>;

    async fn get(&self, id: Uuid) -> Result<Option<StoredReport>, AuditError>;

    /// Most recent first.
    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, AuditError>;

    async fn count(&self) -> Result<usize, AuditError>;
}

fn storage_err(e: anyhow::Error) -> AuditError {
    AuditError::Storage(format!("{e:#}"))
}

fn new_stored(report: AuditReport) -> StoredReport {
    StoredReport {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        report,
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryReportRepository {
    reports: RwLock<Vec<StoredReport>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn save(&self, report: AuditReport) -> Result<Uuid, AuditError> {
        let stored = new_stored(report);
        let id = stored.id;
        self.reports.write().await.push(stored);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredReport>, AuditError> {
        Ok(self.reports.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, AuditError> {
        Ok(self
            .reports
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .map(StoredReport::history_entry)
            .collect())
    }

    async fn count(&self) -> Result<usize, AuditError> {
        Ok(self.reports.read().await.len())
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// SQLite-backed report store. Reports are kept as JSON next to the
/// columns the history view needs.
pub struct SqliteReportRepository {
    conn: Mutex<Connection>,
}

impl SqliteReportRepository {
    /// Open or create the database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!(path = %path, "Report store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("report store connection lock poisoned"))?;
        f(&conn)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS reports (
                    id TEXT PRIMARY KEY,
                    document_name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    issues INTEGER NOT NULL,
                    report TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);",
            )?;
            Ok(())
        })
    }

    fn insert(&self, stored: &StoredReport) -> Result<()> {
        let json = serde_json::to_string(&stored.report)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, document_name, created_at, outcome, issues, report)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stored.id.to_string(),
                    stored.report.document_name,
                    stored.created_at.to_rfc3339(),
                    stored.report.outcome().to_string(),
                    stored.report.issue_count() as i64,
                    json,
                ],
            )?;
            Ok(())
        })
    }

    fn load(&self, id: Uuid) -> Result<Option<StoredReport>> {
        let row: Option<(String, String)> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT created_at, report FROM reports WHERE id = ?1",
                    params![id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;

        let Some((created_at, json)) = row else {
            return Ok(None);
        };
        Ok(Some(StoredReport {
            id,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .context("Corrupt created_at in report store")?
                .with_timezone(&Utc),
            report: serde_json::from_str(&json).context("Corrupt report JSON in report store")?,
        }))
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredReport>> {
        let rows: Vec<(String, String, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, report FROM reports
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, created_at, json)| {
                Ok(StoredReport {
                    id: Uuid::parse_str(&id).context("Corrupt id in report store")?,
                    created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                        .context("Corrupt created_at in report store")?
                        .with_timezone(&Utc),
                    report: serde_json::from_str(&json)
                        .context("Corrupt report JSON in report store")?,
                })
            })
            .collect()
    }

    fn total(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

#[async_trait]
impl ReportRepository for SqliteReportRepository {
    async fn save(&self, report: AuditReport) -> Result<Uuid, AuditError> {
        let stored = new_stored(report);
        self.insert(&stored).map_err(storage_err)?;
        Ok(stored.id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredReport>, AuditError> {
        self.load(id).map_err(storage_err)
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, AuditError> {
        Ok(self
            .recent(limit)
            .map_err(storage_err)?
            .iter()
            .map(StoredReport::history_entry)
            .collect())
    }

    async fn count(&self) -> Result<usize, AuditError> {
        self.total().map_err(storage_err)
    }
}

/// The SQLite store named by the `storage` config section.
pub fn open_repository(config: &StorageConfig) -> Result<Arc<dyn ReportRepository>, AuditError> {
    let repo = SqliteReportRepository::open(&config.db_path).map_err(storage_err)?;
    Ok(Arc::new(repo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use audittrack_core::{AuditOutcome, FieldExtraction, FieldStatus, FieldStatusMap};

    fn report(name: &str, issues: bool) -> AuditReport {
        AuditReport {
            document_name: name.to_string(),
            field_status: FieldStatusMap::from_fn(|_| {
                if issues {
                    FieldStatus::Missing
                } else {
                    FieldStatus::Complete
                }
            }),
            gpt_fields: FieldExtraction::from_response(r#"{"Vendor Name":"Acme Inc"}"#),
            compliance_narrative: "N/A".into(),
            citations: vec!["IRS rule".into()],
            used_ocr: true,
            generated_at: Utc::now(),
        }
    }

    async fn exercise(repo: &dyn ReportRepository) {
        assert_eq!(repo.count().await.unwrap(), 0);

        let first = repo.save(report("first.pdf", false)).await.unwrap();
        let second = repo.save(report("second.pdf", true)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(repo.count().await.unwrap(), 2);

        let stored = repo.get(first).await.unwrap().unwrap();
        assert_eq!(stored.report, report_without_time(&stored.report, "first.pdf"));

        let history = repo.history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].document_name, "second.pdf");
        assert_eq!(history[0].outcome, AuditOutcome::Flagged);
        assert_eq!(history[0].issues, 6);
        assert_eq!(history[1].outcome, AuditOutcome::Passed);

        assert_eq!(repo.history(1).await.unwrap().len(), 1);
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    /// Expected report with the stored timestamp copied over.
    fn report_without_time(stored: &AuditReport, name: &str) -> AuditReport {
        AuditReport {
            generated_at: stored.generated_at,
            ..report(name, false)
        }
    }

    #[tokio::test]
    async fn in_memory_repository() {
        exercise(&InMemoryReportRepository::new()).await;
    }

    #[tokio::test]
    async fn sqlite_repository() {
        exercise(&SqliteReportRepository::in_memory().unwrap()).await;
    }

    #[tokio::test]
    async fn sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.db");
        let path = path.to_str().unwrap();

        let id = {
            let repo = SqliteReportRepository::open(path).unwrap();
            repo.save(report("kept.pdf", false)).await.unwrap()
        };
        let repo = open_repository(&StorageConfig {
            db_path: path.to_string(),
        })
        .unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get(id).await.unwrap().unwrap().report.document_name, "kept.pdf");
    }
}
