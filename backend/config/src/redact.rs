//! Config redaction: mask secrets before a config is printed or logged.

use serde_json::Value;

const SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "token", "secret", "password"];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Replace every sensitive string value with its first four characters and `***`.
pub fn redact(value: &Value) -> Value {
    redact_under(value, "")
}

fn redact_under(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 4 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_under(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_under(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_keys_at_any_depth() {
        let v = json!({
            "llm": {"apiKey": "sk-proj-abcdef123456", "fieldModel": "gpt-4o"},
            "knowledgeBase": {"apiKey": "pcsk_9f8e7d"}
        });
        let out = redact(&v);
        assert_eq!(out["llm"]["apiKey"], "sk-p***");
        assert_eq!(out["knowledgeBase"]["apiKey"], "pcsk***");
        assert_eq!(out["llm"]["fieldModel"], "gpt-4o");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let out = redact(&json!({"apiKey": "abc"}));
        assert_eq!(out["apiKey"], "***");
    }
}
