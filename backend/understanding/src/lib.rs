//! Document understanding: getting text out of uploaded files and checking
//! which audit fields it mentions.

pub mod doc_parse;
pub mod extractor;
pub mod fields;
pub mod ocr;

pub use doc_parse::{LopdfTextSource, NativeTextSource};
pub use extractor::{ensure_supported, TextExtractor, SUPPORTED_EXTENSION};
pub use fields::{check_fields, FieldRules};
pub use ocr::{binarize, otsu_threshold, OcrEngine, TesseractOcr, ToolStatus};
