pub mod mock;
pub mod openai;

use std::sync::Arc;

use audittrack_config::LlmConfig;
use audittrack_core::LlmProvider;

/// The chat provider described by the `llm` config section.
pub fn provider_from_config(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    Arc::new(OpenAiProvider::new(config.api_key.clone()).with_base_url(&config.base_url))
}

pub use openai::OpenAiProvider;
