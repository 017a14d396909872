//! Config validation: collect every problem in one pass.

use crate::schema::AuditConfig;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &AuditConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_services(config, &mut report);
    validate_ocr(config, &mut report);
    validate_pipeline(config, &mut report);
    report
}

fn validate_services(config: &AuditConfig, report: &mut ValidationReport) {
    if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://") {
        report.error("llm.baseUrl", "baseUrl must be an http(s) URL");
    }
    if config.llm.api_key.is_none() {
        report.warn("llm.apiKey", "No LLM API key; field extraction will report errors");
    }
    let kb = &config.knowledge_base;
    if kb.api_key.is_none() {
        report.warn(
            "knowledgeBase.apiKey",
            "No knowledge-base API key; compliance analysis will report errors",
        );
    }
    if kb.index_name.trim().is_empty() && kb.index_host.is_none() {
        report.error("knowledgeBase.indexName", "indexName or indexHost is required");
    }
    if kb.top_k == 0 {
        report.error("knowledgeBase.topK", "topK must be >= 1");
    }
    if kb.embedding_dimensions == Some(0) {
        report.error("knowledgeBase.embeddingDimensions", "embeddingDimensions must be > 0");
    }
}

fn validate_ocr(config: &AuditConfig, report: &mut ValidationReport) {
    let ocr = &config.ocr;
    if ocr.page_seg_mode > 13 {
        report.error("ocr.pageSegMode", "Tesseract page segmentation modes are 0-13");
    }
    if !(72..=1200).contains(&ocr.dpi) {
        report.warn("ocr.dpi", format!("Unusual rasterization DPI {}", ocr.dpi));
    }
    if ocr.timeout_secs == 0 {
        report.error("ocr.timeoutSecs", "timeoutSecs must be > 0");
    }
}

fn validate_pipeline(config: &AuditConfig, report: &mut ValidationReport) {
    if config.analysis.max_input_chars == 0 {
        report.error("analysis.maxInputChars", "maxInputChars must be > 0");
    }
    if config.analysis.call_timeout_secs == 0 {
        report.error("analysis.callTimeoutSecs", "callTimeoutSecs must be > 0");
    }
    if config.analysis.retry.max_attempts == 0 {
        report.error("analysis.retry.maxAttempts", "maxAttempts must be >= 1");
    }
    if config.batch.max_concurrent == 0 {
        report.error("batch.maxConcurrent", "maxConcurrent must be >= 1");
    }
    for (path, tokens) in [
        ("fields.dateTokens", &config.fields.date_tokens),
        ("fields.vendorSuffixes", &config.fields.vendor_suffixes),
    ] {
        if let Some(i) = tokens.iter().position(|t| t.trim().is_empty()) {
            report.error(format!("{path}[{i}]"), "Tokens cannot be empty; an empty token matches every document");
        }
    }
    if config.fields.vendor_suffixes.is_empty() {
        report.warn("fields.vendorSuffixes", "No vendor suffixes; Vendor Name is always Missing");
    }
    if config.storage.db_path.trim().is_empty() {
        report.error("storage.dbPath", "dbPath cannot be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_with_key_warnings() {
        let report = validate(&AuditConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        let paths: Vec<_> = report.warnings.iter().map(|w| w.path.as_str()).collect();
        assert!(paths.contains(&"llm.apiKey"));
        assert!(paths.contains(&"knowledgeBase.apiKey"));
    }

    #[test]
    fn zero_limits_are_errors() {
        let mut cfg = AuditConfig::default();
        cfg.knowledge_base.top_k = 0;
        cfg.batch.max_concurrent = 0;
        cfg.analysis.max_input_chars = 0;
        let report = validate(&cfg);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["knowledgeBase.topK", "analysis.maxInputChars", "batch.maxConcurrent"]
        );
    }

    #[test]
    fn bad_page_seg_mode_is_error() {
        let mut cfg = AuditConfig::default();
        cfg.ocr.page_seg_mode = 20;
        assert!(!validate(&cfg).is_valid());
    }

    #[test]
    fn blank_field_tokens_are_errors() {
        let mut cfg = AuditConfig::default();
        cfg.fields.date_tokens = vec!["2024".into(), "".into()];
        cfg.fields.vendor_suffixes = vec!["LLC".into(), "  ".into()];
        let report = validate(&cfg);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["fields.dateTokens[1]", "fields.vendorSuffixes[1]"]);
    }
}
