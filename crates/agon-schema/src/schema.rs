//! Schema data model, canonical JSON, and the SHA-256 anchor.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Per-key field classification produced by training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Numbers, booleans, or mixed primitive values.
    Scalar,
    /// Free-form strings.
    Str,
    /// Strings backed by a per-field dictionary table.
    Dict,
    /// Nested objects packed as sub-rows.
    Obj,
    /// Arrays of objects packed as arrays of sub-rows.
    List,
}

/// One node of a trained schema: the packing key order plus per-key types,
/// dictionary tables, and sub-schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Keys in packing order: densest first, so sparse trailing fields
    /// truncate away.
    pub keys: Vec<String>,
    pub types: BTreeMap<String, FieldType>,
    /// Dictionary entries per `dict` field; a value's pointer is the
    /// negative of its index plus one.
    pub dicts: BTreeMap<String, Vec<String>>,
    pub subs: BTreeMap<String, SchemaNode>,
}

/// A trained, anchored configuration. Built once by [`crate::train`] and
/// shared read-only between the encoding and decoding sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Caller-chosen config id, echoed in every packet.
    pub cid: String,
    /// 16-hex-char SHA-256 prefix of the canonical JSON of `schema`. Binds
    /// both sides to the exact same key order and dictionary tables.
    pub v: String,
    pub schema: SchemaNode,
}

/// Serialize a value as canonical JSON: compact separators and recursively
/// sorted mapping keys. Training the same samples always produces the same
/// canonical text, which is what makes the anchor reproducible.
pub(crate) fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", Value::String((*key).clone()));
                out.push(':');
                if let Some(child) = map.get(*key) {
                    write_canonical(child, out);
                }
            }
            out.push('}');
        }
        Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

/// Compute the 16-hex-char anchor of a schema.
pub(crate) fn anchor(schema: &SchemaNode) -> Result<String> {
    let value = serde_json::to_value(schema)?;
    let digest = Sha256::digest(canonical_json(&value).as_bytes());
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

/// The reserved sentinel marking a missing (not-present) field in a packed
/// row. Distinct from an explicit JSON `null`, which is preserved.
pub(crate) fn missing() -> Value {
    json!({"_m": 1})
}

pub(crate) fn is_missing(value: &Value) -> bool {
    value
        .as_object()
        .map(|m| m.len() == 1 && m.get("_m").and_then(Value::as_i64) == Some(1))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_sorts_recursively() {
        let v = json!({"b": {"y": 1, "x": 2}, "a": [3, {"q": 1, "p": 2}]});
        assert_eq!(
            canonical_json(&v),
            r#"{"a":[3,{"p":2,"q":1}],"b":{"x":2,"y":1}}"#
        );
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_missing(&json!({"_m": 1})));
        assert!(!is_missing(&json!({"_m": 2})));
        assert!(!is_missing(&json!({"_m": 1, "x": 0})));
        assert!(!is_missing(&json!(null)));
    }
}
