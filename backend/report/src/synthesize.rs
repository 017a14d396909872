use audittrack_core::types::NARRATIVE_PLACEHOLDER;
use audittrack_core::{AuditReport, ComplianceResult, FieldExtraction, FieldStatusMap};
use chrono::Utc;
use tracing::info;

/// Assemble the stage outputs into one report.
///
/// A compliance result without a narrative gets the "N/A" placeholder;
/// sources without snippet text are cited as their JSON rendering.
pub fn synthesize(
    document_name: &str,
    field_status: FieldStatusMap,
    compliance: ComplianceResult,
    gpt_fields: FieldExtraction,
) -> AuditReport {
    info!(document = document_name, "Synthesizing report");
    let citations = compliance.citations();
    AuditReport {
        document_name: document_name.to_string(),
        field_status,
        gpt_fields,
        compliance_narrative: compliance
            .narrative
            .unwrap_or_else(|| NARRATIVE_PLACEHOLDER.to_string()),
        citations,
        used_ocr: false,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audittrack_core::{AuditField, FieldStatus, SourceDocument};
    use serde_json::json;

    fn all_complete() -> FieldStatusMap {
        FieldStatusMap::from_fn(|_| FieldStatus::Complete)
    }

    #[test]
    fn missing_narrative_becomes_placeholder() {
        let report = synthesize(
            "invoice.pdf",
            all_complete(),
            ComplianceResult::default(),
            FieldExtraction::from_response("{}"),
        );
        assert_eq!(report.compliance_narrative, "N/A");
        assert!(report.citations.is_empty());
    }

    #[test]
    fn citations_keep_rank_order_and_stringify_bare_entries() {
        let bare = SourceDocument {
            page_content: None,
            metadata: json!({"source": "GASB 34"}),
            score: Some(0.4),
        };
        let compliance = ComplianceResult {
            narrative: Some("Two issues.".into()),
            sources: vec![SourceDocument::new("IRS rule"), bare.clone(), SourceDocument::new("DOL rule")],
        };
        let report = synthesize("a.pdf", all_complete(), compliance, FieldExtraction::failed("timeout"));

        assert_eq!(report.compliance_narrative, "Two issues.");
        assert_eq!(report.citations.len(), 3);
        assert_eq!(report.citations[0], "IRS rule");
        assert_eq!(report.citations[1], serde_json::to_string(&bare).unwrap());
        assert_eq!(report.citations[2], "DOL rule");
        assert!(report.gpt_fields.is_failed());
    }

    #[test]
    fn failed_compliance_is_carried_verbatim() {
        let report = synthesize(
            "a.pdf",
            FieldStatusMap::from_fn(|f| {
                if f == AuditField::SignaturePresent {
                    FieldStatus::Problem
                } else {
                    FieldStatus::Complete
                }
            }),
            ComplianceResult::failed("index not found"),
            FieldExtraction::from_response("ok"),
        );
        assert_eq!(report.compliance_narrative, "Error in compliance analysis: index not found");
        assert!(report.citations.is_empty());
        assert_eq!(report.issue_count(), 1);
    }
}
