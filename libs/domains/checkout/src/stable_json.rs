//! Deterministic JSON rendering for cache-key derivation.
//!
//! Two structurally-equal values produce identical strings regardless of
//! object key order; arrays stay order-sensitive. The output is an opaque
//! key format, not a cross-version stability guarantee — persisted decisions
//! are session-scoped, so the format may change between deployments.

use serde::Serialize;
use serde_json::Value;

/// Render a JSON value with lexicographically sorted object keys.
pub fn stable_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Serialize any plain DTO into its stable string form.
pub fn stable_serialize<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(stable_string(&serde_json::to_value(value)?))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            out.push_str(&value.to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_value(&map[key], out);
            }
            out.push('}');
        }
    }
}
