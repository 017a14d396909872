//! Structured field extraction.
//!
//! Asks the chat model to pull the audit fields out of a document and answer
//! as JSON. Only the first `max_input_chars` characters of the document are
//! sent; fields that appear later in a long document are reported as
//! "Not Found" by the model.

use std::sync::Arc;

use audittrack_config::AuditConfig;
use audittrack_core::{
    document_prefix, FieldExtraction, LlmProvider, LlmRequest, RetryPolicy, DEFAULT_MAX_INPUT_CHARS,
};
use audittrack_logging::redact_sensitive_data;
use tracing::{info, warn};

/// Prompt for one document prefix.
pub fn build_field_prompt(document: &str) -> String {
    format!(
        r#"You are a compliance audit assistant. Extract the following information from this document:
- Vendor Name
- Date
- Total Amount
- Account Code
- Department or Project
- Signature present (Yes/No)

Format your response as JSON with clear field names.
If a field is missing or unclear, mark it as "Not Found".

Document Text:
"""{document}""""#
    )
}

pub struct StructuredFieldExtractor {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_input_chars: usize,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
}

impl StructuredFieldExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            max_tokens: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &AuditConfig) -> Self {
        let mut extractor = Self::new(provider, &config.llm.field_model)
            .with_max_input_chars(config.analysis.max_input_chars)
            .with_retry(config.analysis.retry.clone());
        extractor.max_tokens = config.llm.max_tokens;
        extractor
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Never fails: a provider error comes back as `FieldExtraction::Failed`.
    pub async fn extract_fields(&self, text: &str) -> FieldExtraction {
        let prompt = build_field_prompt(document_prefix(text, self.max_input_chars));
        let mut request = LlmRequest::deterministic(&self.model, prompt);
        request.max_tokens = self.max_tokens;

        info!(provider = self.provider.name(), model = %self.model, "Starting GPT field extraction");
        let result = self
            .retry
            .run("field_extraction", || self.provider.complete(&request))
            .await;

        match result {
            Ok(response) => {
                info!(tokens = response.tokens_used, latency_ms = response.latency_ms, "GPT field extraction complete");
                FieldExtraction::from_response(response.content)
            }
            Err(e) => {
                let message = redact_sensitive_data(&format!("{e:#}"));
                warn!(error = %message, "GPT field extraction failed");
                FieldExtraction::failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use audittrack_core::types::GPT_ERROR_PREFIX;

    #[test]
    fn prompt_lists_every_field() {
        let prompt = build_field_prompt("Invoice #1");
        for field in [
            "Vendor Name",
            "Date",
            "Total Amount",
            "Account Code",
            "Department or Project",
            "Signature present (Yes/No)",
        ] {
            assert!(prompt.contains(field), "{field}");
        }
        assert!(prompt.contains("\"Not Found\""));
        assert!(prompt.ends_with("\"\"\"Invoice #1\"\"\""));
    }

    #[tokio::test]
    async fn sends_truncated_document_at_zero_temperature() {
        let mock = Arc::new(MockProvider::new("mock").with_response(r#"{"Vendor Name": "Acme Inc"}"#));
        let extractor = StructuredFieldExtractor::new(mock.clone(), "gpt-4o");

        let document = format!("{}{}", "a".repeat(4000), "TAIL");
        let result = extractor.extract_fields(&document).await;

        let FieldExtraction::Extracted { parsed, .. } = &result else {
            panic!("expected extracted, got {result:?}");
        };
        assert_eq!(parsed.as_ref().unwrap()["Vendor Name"], "Acme Inc");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o");
        assert_eq!(requests[0].temperature, 0.0);
        assert!(requests[0].user_prompt.contains(&"a".repeat(4000)));
        assert!(!requests[0].user_prompt.contains("TAIL"));
    }

    #[tokio::test]
    async fn non_json_answer_is_kept_verbatim() {
        let mock = Arc::new(MockProvider::new("mock").with_response("Vendor: Acme Inc"));
        let result = StructuredFieldExtractor::new(mock, "gpt-4o")
            .extract_fields("text")
            .await;
        assert_eq!(result.as_text(), "Vendor: Acme Inc");
        assert!(!result.is_failed());
    }

    #[tokio::test]
    async fn provider_failure_becomes_error_text() {
        let mock = Arc::new(MockProvider::new("mock").failing("connection refused"));
        let result = StructuredFieldExtractor::new(mock, "gpt-4o")
            .extract_fields("text")
            .await;

        assert!(result.is_failed());
        assert!(result.as_text().starts_with(GPT_ERROR_PREFIX));
        assert!(result.as_text().contains("connection refused"));
    }

    #[tokio::test]
    async fn retry_policy_controls_attempts() {
        let mock = Arc::new(MockProvider::new("mock").failing("503"));
        let extractor = StructuredFieldExtractor::new(mock.clone(), "gpt-4o").with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            jitter: false,
            ..RetryPolicy::default()
        });
        assert!(extractor.extract_fields("text").await.is_failed());
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn leaked_keys_are_redacted_from_error_text() {
        let mock = Arc::new(MockProvider::new("mock").failing("401 Incorrect API key sk-abcdefghijklmnopqrstuvwx"));
        let result = StructuredFieldExtractor::new(mock, "gpt-4o")
            .extract_fields("text")
            .await;
        assert!(!result.as_text().contains("sk-abcdefghijklmnopqrstuvwx"));
    }

    #[test]
    fn config_sets_model_and_limits() {
        let mut config = AuditConfig::default();
        config.analysis.max_input_chars = 100;
        config.llm.max_tokens = Some(512);
        let extractor =
            StructuredFieldExtractor::from_config(Arc::new(MockProvider::new("mock")), &config);
        assert_eq!(extractor.model, "gpt-4o");
        assert_eq!(extractor.max_input_chars, 100);
        assert_eq!(extractor.max_tokens, Some(512));
    }
}
