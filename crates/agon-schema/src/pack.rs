//! Positional packet encoding and decoding against a trained schema.
//!
//! A covered list of objects becomes the packet
//! `{"_f":"a","c":cid,"v":anchor,"d":[row,...]}` where each row lists field
//! values in schema key order. Missing fields pack as the sentinel
//! `{"_m":1}` (trailing sentinels truncate away), explicit nulls stay
//! `null`, nested objects and object lists pack recursively, and dictionary
//! strings become negative pointers.
//!
//! Decoding is guarded: anchors must match, rows must look like the encoder
//! could have produced them, and pointers must resolve. Strict mode raises;
//! lenient mode passes each malformed region through unchanged.

use crate::cost::token_cost;
use crate::error::{Result, SchemaError};
use crate::schema::{is_missing, missing, Config, FieldType, SchemaNode};
use serde_json::{json, Map, Value};

/// Encode a value against a trained config.
///
/// The coverage gate keeps this total: data with keys the schema has never
/// seen (or data that is not a list of objects) is emitted as compact raw
/// JSON instead of a packet. Covered data is emitted as whichever of packet
/// and raw JSON counts fewer tokens, unless `force_agon` skips the
/// comparison.
///
/// # Errors
///
/// [`SchemaError::InvalidPayload`] when the input itself contains the
/// reserved sentinel object; tokenizer failures from the cost gate.
pub fn encode_trained(value: &Value, config: &Config, force_agon: bool) -> Result<String> {
    if contains_sentinel(value) {
        return Err(SchemaError::InvalidPayload(
            "input contains the reserved sentinel {\"_m\":1}".to_string(),
        ));
    }
    let raw = serde_json::to_string(value)?;

    let Some(items) = value.as_array() else {
        return Ok(raw);
    };
    let objects: Vec<&Map<String, Value>> = match items
        .iter()
        .map(Value::as_object)
        .collect::<Option<Vec<_>>>()
    {
        Some(objects) => objects,
        None => return Ok(raw),
    };
    if !objects.iter().all(|o| covered(&config.schema, o)) {
        return Ok(raw);
    }

    let rows: Vec<Value> = objects
        .iter()
        .map(|o| pack_row(o, &config.schema))
        .collect();
    let packet = serde_json::to_string(&json!({
        "_f": "a",
        "c": config.cid,
        "v": config.v,
        "d": rows,
    }))?;

    if force_agon || token_cost(&packet)? < token_cost(&raw)? {
        Ok(packet)
    } else {
        Ok(raw)
    }
}

/// Decode trained output. Plain JSON (no `"_f":"a"` marker) passes through;
/// packets are validated and unpacked.
pub fn decode_trained(text: &str, config: &Config, strict: bool) -> Result<Value> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SchemaError::InvalidPayload(format!("Invalid JSON: {e}")))?;
    let Some(packet) = value.as_object() else {
        return Ok(value);
    };
    if packet.get("_f").and_then(Value::as_str) != Some("a") {
        return Ok(value);
    }

    if packet.get("c").and_then(Value::as_str) != Some(config.cid.as_str()) {
        if strict {
            return Err(SchemaError::SchemaMismatch("CID Mismatch".to_string()));
        }
        return Ok(value);
    }
    if packet.get("v").and_then(Value::as_str) != Some(config.v.as_str()) {
        if strict {
            return Err(SchemaError::SchemaMismatch("Version Mismatch".to_string()));
        }
        return Ok(value);
    }
    let Some(rows) = packet.get("d").and_then(Value::as_array) else {
        if strict {
            return Err(SchemaError::DriftDetected(
                "packet field 'd' must be an array".to_string(),
            ));
        }
        return Ok(value);
    };

    let unpacked: Vec<Value> = rows
        .iter()
        .map(|row| unpack_row(row, &config.schema, strict))
        .collect::<Result<_>>()?;
    Ok(Value::Array(unpacked))
}

/// Coverage: every key of every object, recursively, is known to the schema
/// at its position.
fn covered(schema: &SchemaNode, object: &Map<String, Value>) -> bool {
    object.iter().all(|(key, value)| {
        let Some(field_type) = schema.types.get(key) else {
            return false;
        };
        match value {
            Value::Object(map) => {
                *field_type == FieldType::Obj
                    && schema.subs.get(key).is_some_and(|sub| covered(sub, map))
            }
            Value::Array(items) if items.iter().any(|i| i.is_object() || i.is_array()) => {
                *field_type == FieldType::List
                    && schema.subs.get(key).is_some_and(|sub| {
                        items.iter().all(|item| {
                            item.as_object().map(|m| covered(sub, m)).unwrap_or(false)
                        })
                    })
            }
            _ => true,
        }
    })
}

fn pack_row(object: &Map<String, Value>, schema: &SchemaNode) -> Value {
    let mut row: Vec<Value> = Vec::with_capacity(schema.keys.len());
    for key in &schema.keys {
        let cell = match object.get(key) {
            None => missing(),
            Some(Value::Null) => Value::Null,
            Some(value) => pack_cell(key, value, schema),
        };
        row.push(cell);
    }
    // Only trailing sentinels truncate; interior ones keep positions stable.
    while row.last().map(is_missing).unwrap_or(false) {
        row.pop();
    }
    Value::Array(row)
}

fn pack_cell(key: &str, value: &Value, schema: &SchemaNode) -> Value {
    match schema.types.get(key) {
        Some(FieldType::Obj) => match (value.as_object(), schema.subs.get(key)) {
            (Some(map), Some(sub)) => pack_row(map, sub),
            _ => value.clone(),
        },
        Some(FieldType::List) => match (value.as_array(), schema.subs.get(key)) {
            (Some(items), Some(sub)) => Value::Array(
                items
                    .iter()
                    .map(|item| match item.as_object() {
                        Some(map) => pack_row(map, sub),
                        None => item.clone(),
                    })
                    .collect(),
            ),
            _ => value.clone(),
        },
        Some(FieldType::Dict) => match (value.as_str(), schema.dicts.get(key)) {
            (Some(s), Some(entries)) => match entries.iter().position(|e| e == s) {
                Some(index) => Value::Number((-(index as i64) - 1).into()),
                // A string the table has never seen stays literal.
                None => value.clone(),
            },
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

fn unpack_row(row: &Value, schema: &SchemaNode, strict: bool) -> Result<Value> {
    let Some(cells) = row.as_array() else {
        if strict {
            return Err(SchemaError::DriftDetected(format!(
                "packed row must be an array, got {row}"
            )));
        }
        return Ok(row.clone());
    };
    if cells.len() > schema.keys.len() {
        if strict {
            return Err(SchemaError::DriftDetected(format!(
                "row has {} cells but the schema lists {} keys",
                cells.len(),
                schema.keys.len()
            )));
        }
        return Ok(row.clone());
    }

    let mut object = Map::new();
    for (key, cell) in schema.keys.iter().zip(cells) {
        if is_missing(cell) {
            continue;
        }
        if cell.is_null() {
            object.insert(key.clone(), Value::Null);
            continue;
        }
        let value = unpack_cell(key, cell, schema, strict)?;
        object.insert(key.clone(), value);
    }
    Ok(Value::Object(object))
}

fn unpack_cell(key: &str, cell: &Value, schema: &SchemaNode, strict: bool) -> Result<Value> {
    match schema.types.get(key) {
        Some(FieldType::Obj) => {
            if cell.is_array() {
                if let Some(sub) = schema.subs.get(key) {
                    return unpack_row(cell, sub, strict);
                }
            }
            if strict {
                return Err(SchemaError::DriftDetected(format!(
                    "field '{key}' expects a packed sub-row, got {cell}"
                )));
            }
            Ok(cell.clone())
        }
        Some(FieldType::List) => {
            if let (Some(items), Some(sub)) = (cell.as_array(), schema.subs.get(key)) {
                if items.iter().all(Value::is_array) {
                    let unpacked: Vec<Value> = items
                        .iter()
                        .map(|item| unpack_row(item, sub, strict))
                        .collect::<Result<_>>()?;
                    return Ok(Value::Array(unpacked));
                }
            }
            if strict {
                return Err(SchemaError::DriftDetected(format!(
                    "field '{key}' expects an array of packed rows, got {cell}"
                )));
            }
            Ok(cell.clone())
        }
        Some(FieldType::Dict) => {
            if let Some(pointer) = cell.as_i64().filter(|p| *p < 0) {
                let index = (-pointer - 1) as usize;
                match schema.dicts.get(key).and_then(|entries| entries.get(index)) {
                    Some(entry) => return Ok(Value::String(entry.clone())),
                    None => {
                        if strict {
                            return Err(SchemaError::BadReference(format!(
                                "Invalid dict ref {pointer} for field '{key}'"
                            )));
                        }
                        return Ok(cell.clone());
                    }
                }
            }
            // Untrained literal (or a non-pointer value) passes through.
            if cell.is_object() {
                return reject_raw_object(key, cell, strict);
            }
            Ok(cell.clone())
        }
        _ => {
            if cell.is_object() {
                return reject_raw_object(key, cell, strict);
            }
            Ok(cell.clone())
        }
    }
}

/// Raw objects inside a row cannot have come from the encoder; the only
/// object it ever emits there is the sentinel, handled earlier.
fn reject_raw_object(key: &str, cell: &Value, strict: bool) -> Result<Value> {
    if strict {
        return Err(SchemaError::DriftDetected(format!(
            "unexpected object in packed row at field '{key}': {cell}"
        )));
    }
    Ok(cell.clone())
}

/// True when the reserved sentinel appears anywhere in user data.
pub(crate) fn contains_sentinel(value: &Value) -> bool {
    match value {
        Value::Object(map) => is_missing(value) || map.values().any(contains_sentinel),
        Value::Array(items) => items.iter().any(contains_sentinel),
        _ => false,
    }
}
