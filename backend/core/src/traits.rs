use anyhow::Result;
use async_trait::async_trait;

/// A text-completion capability (OpenAI-compatible chat endpoint or a fake).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name used in logs and error messages (e.g., "openai").
    fn name(&self) -> &str;

    /// Send one completion request and return the generated text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl LlmRequest {
    /// A zero-temperature request, used by every analysis stage.
    pub fn deterministic(model: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            user_prompt: user_prompt.into(),
            max_tokens: None,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
