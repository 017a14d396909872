use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of the embedded message when the field-extraction call fails.
pub const GPT_ERROR_PREFIX: &str = "Error calling GPT: ";

/// Prefix of the embedded narrative when the compliance analysis fails.
pub const COMPLIANCE_ERROR_PREFIX: &str = "Error in compliance analysis: ";

/// Placeholder narrative when the compliance stage produced none.
pub const NARRATIVE_PLACEHOLDER: &str = "N/A";

/// Text pulled out of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    /// True iff the OCR fallback ran.
    pub used_ocr: bool,
    pub page_count: usize,
}

impl ExtractionResult {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Field presence
// ---------------------------------------------------------------------------

/// The fixed set of audit fields, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditField {
    #[serde(rename = "Date")]
    Date,
    #[serde(rename = "Vendor Name")]
    VendorName,
    #[serde(rename = "Total Amount")]
    TotalAmount,
    #[serde(rename = "Account Code")]
    AccountCode,
    #[serde(rename = "Department or Project")]
    DepartmentOrProject,
    #[serde(rename = "Signature present")]
    SignaturePresent,
}

impl AuditField {
    pub const ALL: [AuditField; 6] = [
        AuditField::Date,
        AuditField::VendorName,
        AuditField::TotalAmount,
        AuditField::AccountCode,
        AuditField::DepartmentOrProject,
        AuditField::SignaturePresent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AuditField::Date => "Date",
            AuditField::VendorName => "Vendor Name",
            AuditField::TotalAmount => "Total Amount",
            AuditField::AccountCode => "Account Code",
            AuditField::DepartmentOrProject => "Department or Project",
            AuditField::SignaturePresent => "Signature present",
        }
    }
}

impl fmt::Display for AuditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldStatus {
    Complete,
    Missing,
    /// Only ever assigned to `AuditField::SignaturePresent`.
    Problem,
}

impl FieldStatus {
    pub fn is_issue(&self) -> bool {
        !matches!(self, FieldStatus::Complete)
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldStatus::Complete => "Complete",
            FieldStatus::Missing => "Missing",
            FieldStatus::Problem => "Problem",
        };
        f.write_str(label)
    }
}

/// Status of every audit field. Always holds all six fields, iterated in
/// `AuditField::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldStatusMap(BTreeMap<AuditField, FieldStatus>);

impl FieldStatusMap {
    /// Build the map by evaluating `status_of` once per field.
    pub fn from_fn(mut status_of: impl FnMut(AuditField) -> FieldStatus) -> Self {
        Self(
            AuditField::ALL
                .iter()
                .map(|field| (*field, status_of(*field)))
                .collect(),
        )
    }

    pub fn get(&self, field: AuditField) -> FieldStatus {
        self.0.get(&field).copied().unwrap_or(FieldStatus::Missing)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AuditField, FieldStatus)> + '_ {
        self.0.iter().map(|(field, status)| (*field, *status))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields that are Missing or a Problem.
    pub fn issue_count(&self) -> usize {
        self.0.values().filter(|status| status.is_issue()).count()
    }

    pub fn outcome(&self) -> AuditOutcome {
        if self.issue_count() == 0 {
            AuditOutcome::Passed
        } else {
            AuditOutcome::Flagged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Passed,
    Flagged,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Passed => f.write_str("Passed"),
            AuditOutcome::Flagged => f.write_str("Flagged"),
        }
    }
}

// ---------------------------------------------------------------------------
// LLM field extraction
// ---------------------------------------------------------------------------

/// Result of the LLM field-extraction stage.
///
/// Never an error at the pipeline level: a failed call is carried as data so
/// report assembly does not branch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldExtraction {
    Extracted {
        raw: String,
        /// Best-effort JSON parse of `raw`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parsed: Option<serde_json::Value>,
    },
    Failed {
        message: String,
    },
}

impl FieldExtraction {
    /// Wrap a model answer, parsing it as JSON when possible.
    pub fn from_response(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = serde_json::from_str(strip_code_fence(&raw)).ok();
        FieldExtraction::Extracted { raw, parsed }
    }

    pub fn failed(err: impl fmt::Display) -> Self {
        FieldExtraction::Failed {
            message: format!("{GPT_ERROR_PREFIX}{err}"),
        }
    }

    /// The model answer or the error message.
    pub fn as_text(&self) -> &str {
        match self {
            FieldExtraction::Extracted { raw, .. } => raw,
            FieldExtraction::Failed { message } => message,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FieldExtraction::Failed { .. })
    }
}

/// Models often wrap JSON in a markdown fence; strip it before parsing.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

/// One knowledge-base entry returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SourceDocument {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: Some(page_content.into()),
            metadata: serde_json::Value::Null,
            score: None,
        }
    }

    /// Snippet text, or the whole entry as JSON when it carries none.
    pub fn snippet(&self) -> String {
        match &self.page_content {
            Some(content) => content.clone(),
            None => serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub narrative: Option<String>,
    /// Retrieved entries in retrieval-rank order.
    #[serde(default)]
    pub sources: Vec<SourceDocument>,
}

impl ComplianceResult {
    pub fn failed(err: impl fmt::Display) -> Self {
        Self {
            narrative: Some(format!("{COMPLIANCE_ERROR_PREFIX}{err}")),
            sources: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.narrative
            .as_deref()
            .is_some_and(|n| n.starts_with(COMPLIANCE_ERROR_PREFIX))
    }

    pub fn citations(&self) -> Vec<String> {
        self.sources.iter().map(SourceDocument::snippet).collect()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub document_name: String,
    pub field_status: FieldStatusMap,
    pub gpt_fields: FieldExtraction,
    pub compliance_narrative: String,
    pub citations: Vec<String>,
    #[serde(default)]
    pub used_ocr: bool,
    pub generated_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn issue_count(&self) -> usize {
        self.field_status.issue_count()
    }

    pub fn outcome(&self) -> AuditOutcome {
        self.field_status.outcome()
    }
}

/// A report as kept by a report repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub report: AuditReport,
}

impl StoredReport {
    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            document_name: self.report.document_name.clone(),
            outcome: self.report.outcome(),
            issues: self.report.issue_count(),
            created_at: self.created_at,
        }
    }
}

/// Summary row for the processing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub document_name: String,
    pub outcome: AuditOutcome,
    pub issues: usize,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_map_always_holds_every_field_in_order() {
        let map = FieldStatusMap::from_fn(|_| FieldStatus::Complete);
        let fields: Vec<_> = map.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, AuditField::ALL.to_vec());
        assert_eq!(map.outcome(), AuditOutcome::Passed);
    }

    #[test]
    fn status_map_serializes_with_labels_in_order() {
        let map = FieldStatusMap::from_fn(|f| match f {
            AuditField::SignaturePresent => FieldStatus::Problem,
            AuditField::AccountCode => FieldStatus::Missing,
            _ => FieldStatus::Complete,
        });
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"Date":"Complete","Vendor Name":"Complete","Total Amount":"Complete","Account Code":"Missing","Department or Project":"Complete","Signature present":"Problem"}"#
        );
        let back: FieldStatusMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.issue_count(), 2);
        assert_eq!(back.outcome(), AuditOutcome::Flagged);
    }

    #[test]
    fn field_extraction_parses_fenced_json() {
        let fields = FieldExtraction::from_response("```json\n{\"Vendor Name\": \"Acme Inc\"}\n```");
        match fields {
            FieldExtraction::Extracted { parsed, .. } => {
                assert_eq!(parsed, Some(json!({"Vendor Name": "Acme Inc"})));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn field_extraction_keeps_free_text() {
        let fields = FieldExtraction::from_response("Vendor: Acme");
        assert_eq!(fields.as_text(), "Vendor: Acme");
        assert!(matches!(fields, FieldExtraction::Extracted { parsed: None, .. }));
    }

    #[test]
    fn failed_extraction_is_still_a_string() {
        let fields = FieldExtraction::failed("connection refused");
        assert!(fields.is_failed());
        assert_eq!(fields.as_text(), "Error calling GPT: connection refused");
    }

    #[test]
    fn failed_compliance_has_prefix_and_no_sources() {
        let result = ComplianceResult::failed("index not found");
        assert!(result.is_failed());
        assert!(result.sources.is_empty());
        assert!(result
            .narrative
            .unwrap()
            .starts_with(COMPLIANCE_ERROR_PREFIX));
    }

    #[test]
    fn snippet_falls_back_to_json() {
        let doc = SourceDocument {
            page_content: None,
            metadata: json!({"source": "IRS Pub 15"}),
            score: None,
        };
        assert_eq!(doc.snippet(), r#"{"metadata":{"source":"IRS Pub 15"}}"#);
        assert_eq!(SourceDocument::new("GASB 34").snippet(), "GASB 34");
    }
}
