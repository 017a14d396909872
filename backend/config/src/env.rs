//! Environment variable substitution and overrides.
//!
//! String values may reference `${VAR}` or `${VAR:-fallback}`. Only
//! uppercase `[A-Z_][A-Z0-9_]*` names are recognised. A reference without a
//! fallback to an unset or empty variable is an error.

use std::collections::HashMap;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::AuditConfig;

static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute env references across a config value tree using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    let env: HashMap<String, String> = std::env::vars().collect();
    resolve_env_vars_with(value, &env)
}

/// Substitute env references using the given variables.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute(value, env, "")?)
}

fn substitute(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_str(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_str(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }
    let mut missing = None;
    let replaced = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[1];
        match (env.get(name).filter(|v| !v.is_empty()), caps.get(2)) {
            (Some(val), _) => val.clone(),
            (None, Some(fallback)) => fallback.as_str().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });
    match missing {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// Apply environment overrides on top of a loaded config.
///
/// `lookup` returns the value of a variable, or `None` when unset.
pub fn apply_env_overrides(
    mut config: AuditConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AuditConfig {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("OPENAI_API_KEY") {
        config.llm.api_key = Some(key);
    }
    if let Some(url) = get("OPENAI_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(key) = get("PINECONE_API_KEY") {
        config.knowledge_base.api_key = Some(key);
    }
    if let Some(host) = get("PINECONE_INDEX_HOST") {
        config.knowledge_base.index_host = Some(host);
    }
    if let Some(db) = get("AUDITTRACK_DB") {
        config.storage.db_path = db;
    }
    if let Some(level) = get("AUDITTRACK_LOG_LEVEL") {
        config.logging.level = level;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_reference() {
        let v = json!({"llm": {"apiKey": "${OPENAI_API_KEY}"}});
        let out = resolve_env_vars_with(&v, &env(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(out["llm"]["apiKey"], "sk-test");
    }

    #[test]
    fn uses_fallback_when_unset() {
        let v = json!({"storage": {"dbPath": "${AUDIT_DB:-/tmp/audit.db}"}});
        let out = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(out["storage"]["dbPath"], "/tmp/audit.db");
    }

    #[test]
    fn missing_reference_names_var_and_path() {
        let v = json!({"knowledgeBase": {"apiKey": "${PINECONE_API_KEY}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PINECONE_API_KEY"));
        assert!(msg.contains("knowledgeBase.apiKey"));
    }

    #[test]
    fn substitutes_inside_arrays_and_text() {
        let v = json!({"fields": {"dateTokens": ["FY${YEAR}"]}});
        let out = resolve_env_vars_with(&v, &env(&[("YEAR", "2025")])).unwrap();
        assert_eq!(out["fields"]["dateTokens"][0], "FY2025");
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = apply_env_overrides(AuditConfig::default(), |name| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "AUDITTRACK_DB" => Some("/var/lib/audit.db".to_string()),
            "PINECONE_API_KEY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.storage.db_path, "/var/lib/audit.db");
        assert!(config.knowledge_base.api_key.is_none());
    }
}
