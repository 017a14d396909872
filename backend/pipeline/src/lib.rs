//! Runs documents through extraction, field checks, LLM extraction and
//! compliance analysis, and keeps the finished reports.

pub mod batch;
pub mod pipeline;
pub mod store;

pub use batch::{BatchInput, BatchItem, BatchProcessor, BatchSummary};
pub use pipeline::{export_report, AuditPipeline, FieldCheck};
pub use store::{open_repository, InMemoryReportRepository, ReportRepository, SqliteReportRepository};
