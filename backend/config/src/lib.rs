//! `audittrack-config`: runtime configuration for AuditTrack.
//!
//! Provides:
//! - Typed config schema with defaults for every section
//! - YAML loading (absent default file = defaults)
//! - `${ENV_VAR}` / `${ENV_VAR:-fallback}` substitution
//! - Environment overrides for API keys and paths
//! - Validation and redaction

pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use redact::redact;
pub use schema::{
    AnalysisConfig, AuditConfig, BatchConfig, FieldsConfig, KnowledgeBaseConfig, LlmConfig,
    LoggingConfig, OcrConfig, StorageConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply overrides, and validate a config file.
///
/// `path = None` uses `config.yaml` in [`config_dir`], falling back to
/// defaults when that file does not exist. An explicit `path` must exist.
pub async fn load_and_prepare(path: Option<&Path>) -> Result<AuditConfig> {
    let default_path;
    let path = match path {
        Some(p) => {
            if !tokio::fs::try_exists(p).await.unwrap_or(false) {
                bail!("config file not found: {}", p.display());
            }
            p
        }
        None => {
            default_path = config_file_path(&config_dir());
            &default_path
        }
    };

    let raw = load_raw_config(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    let config: AuditConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_env_overrides(config, |name| std::env::var(name).ok());

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{} config error(s), first: {}", report.errors.len(), first);
    }

    Ok(config)
}

impl AuditConfig {
    /// Config as JSON with secrets masked, safe to print.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .map(|v| redact(&v))
            .unwrap_or(serde_json::Value::Null)
    }
}
