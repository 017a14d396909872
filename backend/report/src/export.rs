//! PDF export of the field status table.
//!
//! A4 pages in the standard Helvetica font: a title line, the document
//! name, then one bordered two-cell row per audit field. Rows that do not
//! fit start a new page. Coordinates are PDF points from the bottom-left.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use audittrack_core::{AuditError, AuditReport};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tempfile::NamedTempFile;
use tracing::info;

pub const REPORT_TITLE: &str = "AuditTrack VI - Audit Results Report";

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 28;
const BOTTOM_MARGIN: i64 = 57;
const LINE_HEIGHT: i64 = 28;
const ROW_HEIGHT: i64 = 23;
const CELL_WIDTH: i64 = 227;
const HEADER_FONT_SIZE: i64 = 12;
const TABLE_FONT_SIZE: i64 = 10;

/// Helvetica with WinAnsiEncoding covers Latin-1; anything else prints as `?`.
fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Rough Helvetica advance width, enough to center a title.
fn approx_width(text: &str, font_size: i64) -> i64 {
    text.chars().count() as i64 * font_size / 2
}

fn push_text(ops: &mut Vec<Operation>, font_size: i64, x: i64, baseline: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), font_size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(latin1_bytes(text))]));
    ops.push(Operation::new("ET", vec![]));
}

/// Bordered cell whose top edge is at `top`.
fn push_cell(ops: &mut Vec<Operation>, x: i64, top: i64, text: &str) {
    let bottom = top - ROW_HEIGHT;
    ops.push(Operation::new(
        "re",
        vec![x.into(), bottom.into(), CELL_WIDTH.into(), ROW_HEIGHT.into()],
    ));
    ops.push(Operation::new("S", vec![]));
    let baseline = top - ROW_HEIGHT / 2 - TABLE_FONT_SIZE * 3 / 10;
    push_text(ops, TABLE_FONT_SIZE, x + 3, baseline, text);
}

/// Lay out the header and rows into one operation list per page.
fn layout_pages(document_name: &str, rows: &[(String, String)]) -> Vec<Vec<Operation>> {
    let mut pages = Vec::new();
    let mut ops = Vec::new();
    let mut top = PAGE_HEIGHT - MARGIN;

    let title_x = (PAGE_WIDTH - approx_width(REPORT_TITLE, HEADER_FONT_SIZE)) / 2;
    push_text(&mut ops, HEADER_FONT_SIZE, title_x, top - 18, REPORT_TITLE);
    top -= LINE_HEIGHT;
    push_text(
        &mut ops,
        HEADER_FONT_SIZE,
        MARGIN + 3,
        top - 18,
        &format!("Document: {document_name}"),
    );
    top -= 2 * LINE_HEIGHT;

    for (field, status) in rows {
        if top - ROW_HEIGHT < BOTTOM_MARGIN {
            pages.push(std::mem::take(&mut ops));
            top = PAGE_HEIGHT - MARGIN;
        }
        push_cell(&mut ops, MARGIN, top, field);
        push_cell(&mut ops, MARGIN + CELL_WIDTH, top, status);
        top -= ROW_HEIGHT;
    }
    pages.push(ops);
    pages
}

fn build_document(document_name: &str, rows: &[(String, String)]) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in layout_pages(document_name, rows) {
        let content = Content { operations };
        let encoded = content.encode().context("Failed to encode page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

/// Save through a temp file in the destination directory, then rename over
/// `destination`. A failed save leaves `destination` as it was.
fn save_document(doc: &mut Document, destination: &Path) -> Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temp file in {}", dir.display()))?;
    doc.save_to(&mut staged)
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    staged
        .persist(destination)
        .with_context(|| format!("Failed to move export into {}", destination.display()))?;
    Ok(())
}

fn write_rows(document_name: &str, rows: &[(String, String)], destination: &Path) -> Result<()> {
    let mut doc = build_document(document_name, rows)?;
    save_document(&mut doc, destination)
}

/// Render the report's field table to `destination`.
///
/// On failure `destination` is left untouched.
pub fn export_pdf(report: &AuditReport, destination: &Path) -> Result<PathBuf, AuditError> {
    info!(document = %report.document_name, path = %destination.display(), "Exporting audit report");
    let rows: Vec<(String, String)> = report
        .field_status
        .iter()
        .map(|(field, status)| (field.label().to_string(), status.to_string()))
        .collect();

    write_rows(&report.document_name, &rows, destination)
        .map_err(|e| AuditError::Export(format!("{e:#}")))?;
    info!(path = %destination.display(), "PDF export complete");
    Ok(destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use audittrack_core::{FieldExtraction, FieldStatus, FieldStatusMap};
    use chrono::Utc;

    fn report(name: &str) -> AuditReport {
        AuditReport {
            document_name: name.to_string(),
            field_status: FieldStatusMap::from_fn(|_| FieldStatus::Missing),
            gpt_fields: FieldExtraction::from_response("{}"),
            compliance_narrative: "N/A".into(),
            citations: vec![],
            used_ocr: false,
            generated_at: Utc::now(),
        }
    }

    fn rows(n: usize) -> Vec<(String, String)> {
        (0..n).map(|i| (format!("Field {i}"), "Complete".to_string())).collect()
    }

    #[test]
    fn field_table_fits_on_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        let written = export_pdf(&report("invoice.pdf"), &path).unwrap();
        assert_eq!(written, path);

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains(REPORT_TITLE));
        assert!(text.contains("Document: invoice.pdf"));
        assert!(text.contains("Department or Project"));
    }

    #[test]
    fn long_tables_continue_on_new_pages() {
        assert_eq!(layout_pages("a.pdf", &rows(6)).len(), 1);
        let pages = layout_pages("a.pdf", &rows(100)).len();
        assert!(pages >= 3, "got {pages} pages");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        write_rows("a.pdf", &rows(100), &path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), pages);
    }

    #[test]
    fn rows_follow_field_order() {
        let pages = layout_pages("a.pdf", &rows(3));
        let strings: Vec<Vec<u8>> = pages[0]
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first().and_then(|o| o.as_str().ok()).map(|s| s.to_vec()))
            .collect();
        assert_eq!(strings[2], b"Field 0".to_vec());
        assert_eq!(strings[4], b"Field 1".to_vec());
        assert_eq!(strings[6], b"Field 2".to_vec());
    }

    #[test]
    fn non_latin1_becomes_question_mark() {
        assert_eq!(latin1_bytes("Café ✅"), vec![b'C', b'a', b'f', 0xE9, b' ', b'?']);
    }

    #[test]
    fn unwritable_destination_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("report.pdf");

        let err = export_pdf(&report("a.pdf"), &path).unwrap_err();
        assert!(matches!(err, AuditError::Export(_)));
        assert!(!path.exists());
    }

    #[test]
    fn overwrites_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"stale").unwrap();

        export_pdf(&report("invoice.pdf"), &path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn failed_export_keeps_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), b"mine").unwrap();

        let err = export_pdf(&report("a.pdf"), &path).unwrap_err();
        assert!(matches!(err, AuditError::Export(_)));
        assert_eq!(std::fs::read(path.join("keep.txt")).unwrap(), b"mine");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1, "no staged file left behind");
    }
}
