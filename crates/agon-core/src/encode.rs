//! The adaptive selector: encode into every candidate format, measure, and
//! keep the cheapest one that clears the savings threshold.

use crate::error::Result;
use crate::types::{EncodingResult, Format};
use crate::{columns, rows, template, tokenizer};
use rayon::prelude::*;
use serde_json::Value;

/// Options for [`encode`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Encode into exactly this format instead of selecting adaptively.
    pub format: Option<Format>,
    /// Never return raw JSON from the adaptive path (drops it from the
    /// candidate set entirely).
    pub force: bool,
    /// Minimum savings ratio versus raw JSON a non-JSON winner must reach;
    /// below it the JSON candidate is returned.
    pub min_savings: f64,
    /// Tokenizer encoding for cost measurement. `None` uses byte length as
    /// a fast proxy.
    pub encoding: Option<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            format: None,
            force: false,
            min_savings: 0.10,
            encoding: None,
        }
    }
}

/// Encode a value into the most token-efficient AGON format.
///
/// With `format` set, this is a direct dispatch to that codec. Otherwise the
/// candidates `[json, rows, columns, struct]` (json dropped under `force`)
/// are encoded in parallel, costed, and the cheapest wins; ties break by the
/// candidate order, so selection is deterministic regardless of thread
/// scheduling.
///
/// # Errors
///
/// Only tokenizer loading can fail here; encoding itself never fails on a
/// well-formed value.
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<EncodingResult> {
    if let Some(format) = options.format {
        return encode_as(value, format);
    }

    let candidates: &[Format] = if options.force {
        &[Format::Rows, Format::Columns, Format::Struct]
    } else {
        &Format::ALL
    };

    let mut results = candidates
        .par_iter()
        .map(|format| encode_as(value, *format))
        .collect::<Result<Vec<_>>>()?;
    let costs = results
        .iter()
        .map(|r| tokenizer::cost(&r.text, options.encoding.as_deref()))
        .collect::<Result<Vec<_>>>()?;

    let mut best = 0;
    for i in 1..results.len() {
        if costs[i] < costs[best] {
            best = i;
        }
    }

    if !options.force && results[best].format != Format::Json {
        if let Some(json_idx) = results.iter().position(|r| r.format == Format::Json) {
            let json_cost = costs[json_idx].max(1);
            let savings = 1.0 - costs[best] as f64 / json_cost as f64;
            if savings < options.min_savings {
                return Ok(results.swap_remove(json_idx));
            }
        }
    }
    Ok(results.swap_remove(best))
}

/// Encode a value into one specific format.
pub fn encode_as(value: &Value, format: Format) -> Result<EncodingResult> {
    let text = match format {
        Format::Json => serde_json::to_string(value)?,
        Format::Rows => rows::encode_body(value),
        Format::Columns => columns::encode_body(value),
        Format::Struct => template::encode_body(value),
    };
    Ok(EncodingResult::new(format, text))
}
