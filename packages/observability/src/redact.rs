//! Field redaction applied before a log line is written.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Replacement text for redacted values.
pub const REDACTED: &str = "[REDACTED]";

const DENYLIST_KEYS: [&str; 7] = [
    "password",
    "token",
    "authorization",
    "secret",
    "cookie",
    "credential",
    "private_key",
];

/// Whether a field name looks like it carries a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

/// Redact a single value, recursing into objects and arrays.
pub fn redact_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) if s.to_ascii_lowercase().starts_with("bearer ") => {
            Value::String(REDACTED.to_string())
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), redact_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_value(key, v)).collect()),
        _ => value.clone(),
    }
}

pub(crate) fn redact_fields(fields: HashMap<String, Value>) -> HashMap<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| {
            let redacted = redact_value(&k, &v);
            (k, redacted)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensitive_keys_are_case_insensitive() {
        assert!(is_sensitive_key("password_hash"));
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("ADMIN_SECRET"));
        assert!(!is_sensitive_key("database"));
        assert!(!is_sensitive_key("request_id"));
    }

    #[test]
    fn nested_values_are_redacted() {
        let value = json!({ "user": "root", "auth": { "token": "abc" } });
        let redacted = redact_value("payload", &value);
        assert_eq!(redacted["user"], "root");
        assert_eq!(redacted["auth"]["token"], REDACTED);
    }

    #[test]
    fn bearer_strings_are_redacted_under_any_key() {
        let value = Value::String("Bearer $2b$10$abcdef".to_string());
        assert_eq!(redact_value("header", &value), Value::String(REDACTED.into()));
    }
}
