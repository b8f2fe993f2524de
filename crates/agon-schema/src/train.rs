//! Schema induction: walk a training corpus, classify each key, and decide
//! which string fields earn a dictionary.

use crate::cost::token_cost;
use crate::error::{Result, SchemaError};
use crate::schema::{anchor, Config, FieldType, SchemaNode};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Knobs for [`train`]. The defaults match the adaptive variant's tuning.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Minimum net token gain (savings minus amortized prompt cost) a
    /// string field must reach to be upgraded to a dictionary.
    pub min_gain: f64,
    /// Number of requests the dictionary's prompt overhead is spread over.
    pub amortize: usize,
    /// Hard cap on dictionary entries per field.
    pub max_dict_per_field: usize,
    /// Only admit short, single-line, enum-like values.
    pub enum_like_only: bool,
    /// Maximum entry length under `enum_like_only`.
    pub max_enum_len: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            min_gain: 3.0,
            amortize: 50,
            max_dict_per_field: 100,
            enum_like_only: true,
            max_enum_len: 64,
        }
    }
}

/// Induce an anchored schema from sample objects.
///
/// Keys are ordered densest-first (fraction of samples carrying the key,
/// descending, stable on ties), which pushes sparse fields to the end of
/// every packed row where their missing sentinels truncate away.
///
/// # Errors
///
/// [`SchemaError::InvalidPayload`] when a sample is not an object;
/// tokenizer failures bubble up from the dictionary cost model.
pub fn train(samples: &[Value], cid: &str, options: &TrainOptions) -> Result<Config> {
    let objects: Vec<&Map<String, Value>> = samples
        .iter()
        .map(|sample| {
            sample.as_object().ok_or_else(|| {
                SchemaError::InvalidPayload("training samples must be objects".to_string())
            })
        })
        .collect::<Result<_>>()?;
    let schema = induce(&objects, options)?;
    let v = anchor(&schema)?;
    Ok(Config {
        cid: cid.to_string(),
        v,
        schema,
    })
}

fn induce(objects: &[&Map<String, Value>], options: &TrainOptions) -> Result<SchemaNode> {
    // Presence counts in first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut presence: HashMap<String, usize> = HashMap::new();
    for object in objects {
        for key in object.keys() {
            if !presence.contains_key(key) {
                order.push(key.clone());
            }
            *presence.entry(key.clone()).or_insert(0) += 1;
        }
    }
    // Dense-first; Vec::sort_by is stable, so ties keep first-seen order.
    let mut keys = order;
    keys.sort_by(|a, b| presence[b].cmp(&presence[a]));

    let mut node = SchemaNode {
        keys: keys.clone(),
        ..SchemaNode::default()
    };

    for key in &keys {
        // Nulls carry no type information; classify over the rest.
        let values: Vec<&Value> = objects
            .iter()
            .filter_map(|o| o.get(key))
            .filter(|v| !v.is_null())
            .collect();

        let field_type = if !values.is_empty() && values.iter().all(|v| v.is_object()) {
            let children: Vec<&Map<String, Value>> =
                values.iter().filter_map(|v| v.as_object()).collect();
            node.subs.insert(key.clone(), induce(&children, options)?);
            FieldType::Obj
        } else if !values.is_empty() && all_object_arrays(&values) {
            let children: Vec<&Map<String, Value>> = values
                .iter()
                .filter_map(|v| v.as_array())
                .flatten()
                .filter_map(|v| v.as_object())
                .collect();
            node.subs.insert(key.clone(), induce(&children, options)?);
            FieldType::List
        } else if !values.is_empty() && values.iter().all(|v| v.is_string()) {
            let strings: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
            match dictionary_for(key, &strings, options)? {
                Some(entries) => {
                    node.dicts.insert(key.clone(), entries);
                    FieldType::Dict
                }
                None => FieldType::Str,
            }
        } else {
            FieldType::Scalar
        };
        node.types.insert(key.clone(), field_type);
    }
    Ok(node)
}

fn all_object_arrays(values: &[&Value]) -> bool {
    values.iter().all(|v| {
        v.as_array()
            .map(|arr| arr.iter().all(Value::is_object))
            .unwrap_or(false)
    })
}

/// Decide whether a string field pays for a dictionary, returning the entry
/// table if it does.
///
/// Candidates are ranked by frequency (stable on ties), admitted at
/// frequency two or more up to the per-field cap, and filtered for enum-like
/// shape. The per-use saving of an entry is the token difference between its
/// JSON literal and its negative pointer; the table's one-off prompt cost is
/// amortized over `options.amortize` requests.
fn dictionary_for(key: &str, values: &[&str], options: &TrainOptions) -> Result<Option<Vec<String>>> {
    let mut order: Vec<&str> = Vec::new();
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for &v in values {
        if !freq.contains_key(v) {
            order.push(v);
        }
        *freq.entry(v).or_insert(0) += 1;
    }
    let mut candidates: Vec<(&str, usize)> = order
        .into_iter()
        .map(|v| (v, freq[v]))
        .filter(|(_, f)| *f >= 2)
        .collect();
    if options.enum_like_only {
        candidates.retain(|(v, _)| {
            v.len() <= options.max_enum_len && !v.contains(['\n', '\r', '\t'])
        });
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.truncate(options.max_dict_per_field);
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut savings = 0.0;
    let mut entry_tokens = 0usize;
    for (i, (entry, uses)) in candidates.iter().enumerate() {
        let literal = token_cost(&serde_json::to_string(entry)?)? as f64;
        let pointer = token_cost(&format!("{}", -(i as i64 + 1)))? as f64;
        savings += (literal - pointer) * *uses as f64;
        entry_tokens += token_cost(entry)?;
    }
    let prompt_cost = (token_cost(key)? + entry_tokens + candidates.len() + 4) as f64
        / options.amortize.max(1) as f64;

    if savings - prompt_cost >= options.min_gain {
        Ok(Some(
            candidates.into_iter().map(|(v, _)| v.to_string()).collect(),
        ))
    } else {
        Ok(None)
    }
}
