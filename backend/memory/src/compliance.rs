//! Compliance analysis against the regulatory knowledge base.

use std::sync::Arc;

use audittrack_config::AuditConfig;
use audittrack_core::{
    document_prefix, ComplianceResult, LlmProvider, RetryPolicy, DEFAULT_MAX_INPUT_CHARS,
};
use audittrack_logging::redact_sensitive_data;
use tracing::{info, warn};

use crate::embeddings::OpenAIEmbeddings;
use crate::pinecone::PineconeIndex;
use crate::qa::RetrievalQa;

/// The retrieval question for one document prefix.
pub fn compliance_query(document: &str) -> String {
    format!(
        "Analyze this document for compliance issues with IRS, USVI DOL, and GASB requirements:\n\n{document}"
    )
}

pub struct ComplianceAnalyzer {
    qa: RetrievalQa,
    max_input_chars: usize,
    retry: RetryPolicy,
}

impl ComplianceAnalyzer {
    pub fn new(qa: RetrievalQa) -> Self {
        Self {
            qa,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            retry: RetryPolicy::default(),
        }
    }

    /// OpenAI embeddings + Pinecone index + the configured compliance model.
    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &AuditConfig) -> Self {
        let kb = &config.knowledge_base;
        let embedder = OpenAIEmbeddings::new(
            config.llm.api_key.clone(),
            &kb.embedding_model,
            kb.embedding_dimensions,
        )
        .with_base_url(&config.llm.base_url);
        let qa = RetrievalQa::new(
            Arc::new(embedder),
            Arc::new(PineconeIndex::from_config(kb)),
            llm,
            &config.llm.compliance_model,
        )
        .with_top_k(kb.top_k)
        .with_max_tokens(config.llm.max_tokens);

        Self::new(qa)
            .with_max_input_chars(config.analysis.max_input_chars)
            .with_retry(config.analysis.retry.clone())
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Never fails: any error becomes an "Error in compliance analysis"
    /// narrative with no sources.
    pub async fn analyze(&self, text: &str) -> ComplianceResult {
        let query = compliance_query(document_prefix(text, self.max_input_chars));
        info!("Starting compliance analysis");

        match self.retry.run("compliance_analysis", || self.qa.ask(&query)).await {
            Ok(answer) => {
                info!(sources = answer.sources.len(), "Compliance analysis complete");
                ComplianceResult {
                    narrative: Some(answer.answer),
                    sources: answer.sources,
                }
            }
            Err(e) => {
                let message = redact_sensitive_data(&format!("{e:#}"));
                warn!(error = %message, "Compliance analysis failed");
                ComplianceResult::failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::tests::{rules_index, FailingEmbedder, KeywordEmbedder, RecordingLlm};
    use audittrack_core::types::COMPLIANCE_ERROR_PREFIX;

    #[test]
    fn query_names_all_three_frameworks() {
        let q = compliance_query("Invoice");
        assert_eq!(
            q,
            "Analyze this document for compliance issues with IRS, USVI DOL, and GASB requirements:\n\nInvoice"
        );
    }

    #[tokio::test]
    async fn narrative_and_ranked_citations() {
        let llm = Arc::new(RecordingLlm::default());
        let qa = RetrievalQa::new(Arc::new(KeywordEmbedder), rules_index(), llm.clone(), "gpt-3.5-turbo-16k");
        let result = ComplianceAnalyzer::new(qa).analyze("Invoice").await;

        assert!(!result.is_failed());
        assert_eq!(result.narrative.as_deref(), Some("No IRS issues found; Form 1099 needed."));
        let citations = result.citations();
        assert_eq!(citations.len(), 3);
        // The query always names the IRS, so its rule ranks first.
        assert_eq!(citations[0], "IRS: vendors paid $600+ need Form 1099-NEC.");
    }

    #[tokio::test]
    async fn document_is_truncated_before_querying() {
        let llm = Arc::new(RecordingLlm::default());
        let qa = RetrievalQa::new(Arc::new(KeywordEmbedder), rules_index(), llm.clone(), "gpt-3.5-turbo-16k");
        let analyzer = ComplianceAnalyzer::new(qa).with_max_input_chars(10);

        analyzer.analyze("0123456789TAIL").await;
        let request = llm.last.lock().unwrap().clone().unwrap();
        assert!(request.user_prompt.ends_with("\n\n0123456789"));
    }

    #[tokio::test]
    async fn connectivity_error_becomes_error_narrative() {
        let qa = RetrievalQa::new(
            Arc::new(FailingEmbedder),
            rules_index(),
            Arc::new(RecordingLlm::default()),
            "gpt-3.5-turbo-16k",
        );
        let result = ComplianceAnalyzer::new(qa).analyze("Invoice").await;

        assert!(result.is_failed());
        assert!(result.narrative.as_deref().unwrap().starts_with(COMPLIANCE_ERROR_PREFIX));
        assert!(result.citations().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_services_degrade_instead_of_failing() {
        let config = AuditConfig::default();
        let analyzer = ComplianceAnalyzer::from_config(Arc::new(RecordingLlm::default()), &config);
        let result = analyzer.analyze("Invoice").await;

        assert!(result.is_failed());
        assert!(result.narrative.unwrap().contains("OPENAI_API_KEY"));
        assert!(result.sources.is_empty());
    }
}
