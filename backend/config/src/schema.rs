//! AuditTrack runtime configuration schema.
//!
//! Every section has defaults, so an empty (or absent) YAML file yields a
//! runnable config; only API keys have to come from somewhere.

use audittrack_core::{RetryPolicy, DEFAULT_MAX_INPUT_CHARS};
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditConfig {
    pub llm: LlmConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub ocr: OcrConfig,
    pub analysis: AnalysisConfig,
    pub fields: FieldsConfig,
    pub batch: BatchConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// External services
// ---------------------------------------------------------------------------

/// OpenAI-compatible text-completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used for structured field extraction.
    pub field_model: String,
    /// Model used to answer the compliance retrieval query.
    pub compliance_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            field_model: "gpt-4o".to_string(),
            compliance_model: "gpt-3.5-turbo-16k".to_string(),
            max_tokens: None,
        }
    }
}

/// Regulatory knowledge base (Pinecone index + embedding model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeBaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub index_name: String,
    /// Data-plane host; resolved from the control plane when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,
    pub control_plane_url: String,
    pub top_k: usize,
    pub embedding_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dimensions: Option<u32>,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: "rules-knowledge-base".to_string(),
            index_host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            top_k: 3,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: Some(1024),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrConfig {
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
    /// Rasterization resolution.
    pub dpi: u32,
    pub language: String,
    /// Tesseract page segmentation mode (6 = single uniform block of text).
    pub page_seg_mode: u8,
    /// Timeout for each external OCR tool invocation.
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
            dpi: 300,
            language: "eng".to_string(),
            page_seg_mode: 6,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Leading characters of a document sent to either LLM stage.
    pub max_input_chars: usize,
    /// Timeout for each LLM / knowledge-base stage.
    pub call_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            call_timeout_secs: 120,
            retry: RetryPolicy::default(),
        }
    }
}

/// Token lists for the field presence checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldsConfig {
    /// Tokens accepted as a date. Empty means "the current and three previous years".
    pub date_tokens: Vec<String>,
    pub vendor_suffixes: Vec<String>,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            date_tokens: Vec::new(),
            vendor_suffixes: vec!["LLC".to_string(), "Inc".to_string(), "Corp".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfig {
    /// Documents processed at the same time in a batch.
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// SQLite database for finished reports (`:memory:` keeps nothing).
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "audittrack.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling NDJSON log files; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// JSON console output instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}
