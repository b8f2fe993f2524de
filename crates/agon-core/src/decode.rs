//! The decoder multiplexer: dispatch a payload to the right codec by its
//! header prefix, falling back to strict JSON.

use crate::error::{AgonError, Result};
use crate::types::Format;
use crate::{columns, rows, template};
use serde_json::Value;

/// Decode any AGON payload by prefix detection.
///
/// Leading whitespace is ignored; a payload starting with `@AGON rows`,
/// `@AGON columns`, or `@AGON struct` goes to the matching codec, anything
/// else must be strict JSON.
///
/// # Errors
///
/// [`AgonError::InvalidPayload`] when the payload matches no header and is
/// not valid JSON, or when a headed payload is syntactically malformed.
pub fn decode(payload: &str) -> Result<Value> {
    let text = payload.trim_start();
    if text.starts_with(rows::HEADER) {
        return rows::decode(text);
    }
    if text.starts_with(columns::HEADER) {
        return columns::decode(text);
    }
    if text.starts_with(template::HEADER) {
        return template::decode(text);
    }
    serde_json::from_str(text.trim())
        .map_err(|e| AgonError::InvalidPayload(format!("Invalid JSON: {e}")))
}

/// Decode text whose format is already known, so no header is required
/// (one is tolerated if present). This is how [`crate::EncodingResult`]
/// decodes its own detached-header text.
pub fn decode_as(payload: &str, format: Format) -> Result<Value> {
    match format {
        Format::Json => serde_json::from_str(payload.trim())
            .map_err(|e| AgonError::InvalidPayload(format!("Invalid JSON: {e}"))),
        Format::Rows => rows::decode_lenient(payload),
        Format::Columns => columns::decode_lenient(payload),
        Format::Struct => template::decode_lenient(payload),
    }
}
