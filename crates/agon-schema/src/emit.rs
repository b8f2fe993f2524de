//! Consumer-facing artifacts of a trained config: a strict JSON Schema for
//! structured-output constrained decoding, and a compact system prompt.

use crate::schema::{Config, FieldType, SchemaNode};
use serde_json::{json, Value};
use std::fmt::Write as _;

/// Build a strict JSON Schema for packets of this config, in the shape
/// OpenAI-style structured outputs accept: every property required,
/// `additionalProperties: false`, and the anchor fields pinned by `const`.
/// Rows are `prefixItems` tuples where each position admits the missing
/// sentinel, `null`, or the field's own type.
pub fn json_schema(config: &Config) -> Value {
    json!({
        "type": "object",
        "properties": {
            "_f": {"type": "string", "const": "a"},
            "c": {"type": "string", "const": config.cid},
            "v": {"type": "string", "const": config.v},
            "d": {"type": "array", "items": row_schema(&config.schema)},
        },
        "required": ["_f", "c", "v", "d"],
        "additionalProperties": false,
    })
}

fn row_schema(schema: &SchemaNode) -> Value {
    let prefix: Vec<Value> = schema
        .keys
        .iter()
        .map(|key| cell_schema(key, schema))
        .collect();
    json!({
        "type": "array",
        "prefixItems": prefix,
        "items": false,
        "maxItems": schema.keys.len(),
    })
}

fn cell_schema(key: &str, schema: &SchemaNode) -> Value {
    let mut any_of = vec![sentinel_schema(), json!({"type": "null"})];
    match schema.types.get(key) {
        Some(FieldType::Str) => any_of.push(json!({"type": "string"})),
        Some(FieldType::Dict) => {
            any_of.push(json!({"type": "integer", "maximum": -1}));
            any_of.push(json!({"type": "string"}));
        }
        Some(FieldType::Obj) => {
            if let Some(sub) = schema.subs.get(key) {
                any_of.push(row_schema(sub));
            }
        }
        Some(FieldType::List) => {
            if let Some(sub) = schema.subs.get(key) {
                any_of.push(json!({"type": "array", "items": row_schema(sub)}));
            }
        }
        Some(FieldType::Scalar) | None => {
            any_of.push(json!({"type": ["string", "number", "boolean"]}));
        }
    }
    json!({"anyOf": any_of})
}

fn sentinel_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"_m": {"type": "integer", "const": 1}},
        "required": ["_m"],
        "additionalProperties": false,
    })
}

/// Build the compact model-facing description of a config: the packet
/// envelope with its anchor, the key order of the root and every sub-schema,
/// and each dictionary table. Stays well under two hundred tokens for
/// typical schemas.
pub fn system_prompt(config: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "AGON packet: {{\"_f\":\"a\",\"c\":\"{}\",\"v\":\"{}\",\"d\":[rows]}}.",
        config.cid, config.v
    );
    out.push_str(
        "Rows list field values positionally. {\"_m\":1} marks a missing field; \
         trailing missing entries are dropped. Negative integers are dictionary \
         pointers: -1 is the first entry.\n",
    );
    describe(&config.schema, "", &mut out);
    out.trim_end().to_string()
}

fn describe(schema: &SchemaNode, path: &str, out: &mut String) {
    let label = if path.is_empty() {
        "fields".to_string()
    } else {
        format!("{path} fields")
    };
    let _ = writeln!(out, "{label}: {}", schema.keys.join(", "));
    for (key, entries) in &schema.dicts {
        let name = join_path(path, key);
        let table: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{}={entry}", -(i as i64) - 1))
            .collect();
        let _ = writeln!(out, "{name} dict: {}", table.join(", "));
    }
    for (key, sub) in &schema.subs {
        describe(sub, &join_path(path, key), out);
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
