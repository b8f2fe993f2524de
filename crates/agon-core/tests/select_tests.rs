//! Tests for the public API: format dispatch, the adaptive selector, the
//! decoder multiplexer, token counting, and the result container.

use agon_core::{
    count_tokens, decode, decode_as, encode, encode_as, AgonError, EncodeOptions, Format,
};
use serde_json::{json, Value};

fn simple_data() -> Value {
    json!([
        {"id": 1, "name": "Alice", "role": "admin"},
        {"id": 2, "name": "Bob", "role": "user"},
        {"id": 3, "name": "Charlie", "role": "user"},
    ])
}

fn fixed(format: Format) -> EncodeOptions {
    EncodeOptions {
        format: Some(format),
        ..EncodeOptions::default()
    }
}

// ============================================================================
// Format dispatch
// ============================================================================

#[test]
fn encode_json_format_returns_json() {
    let data = json!({"a": 1, "b": [1, 2, 3]});
    let result = encode(&data, &fixed(Format::Json)).unwrap();
    assert_eq!(result.format, Format::Json);
    assert_eq!(result.header, None);
    assert_eq!(serde_json::from_str::<Value>(&result.text).unwrap(), data);
}

#[test]
fn encode_rows_format_carries_header() {
    let result = encode(&json!({"a": 1, "b": "x"}), &fixed(Format::Rows)).unwrap();
    assert_eq!(result.format, Format::Rows);
    assert_eq!(result.header.as_deref(), Some("@AGON rows"));
    assert!(!result.text.contains("@AGON rows"));
}

#[test]
fn encode_struct_keeps_definitions_in_text_not_header() {
    let data = json!({
        "price": {"fmt": "100.00", "raw": 100.0},
        "change": {"fmt": "+5.00", "raw": 5.0},
        "volume": {"fmt": "1M", "raw": 1000000},
    });
    let result = encode(&data, &fixed(Format::Struct)).unwrap();
    assert_eq!(result.format, Format::Struct);
    assert_eq!(result.header.as_deref(), Some("@AGON struct"));
    assert!(!result.text.contains("@AGON struct"));
    assert!(result.text.contains("@FR: fmt, raw"));
}

#[test]
fn encode_as_matches_options_dispatch() {
    let data = simple_data();
    for format in Format::ALL {
        let a = encode_as(&data, format).unwrap();
        let b = encode(&data, &fixed(format)).unwrap();
        assert_eq!(a, b);
    }
}

// ============================================================================
// Decoder multiplexer
// ============================================================================

#[test]
fn decode_detects_rows_payload() {
    let payload = agon_core::rows::encode(&json!({"x": 1}));
    assert_eq!(decode(&payload).unwrap(), json!({"x": 1}));
}

#[test]
fn decode_detects_columns_payload() {
    let payload = agon_core::columns::encode(&simple_data());
    assert_eq!(decode(&payload).unwrap(), simple_data());
}

#[test]
fn decode_detects_struct_payload() {
    let data = json!({
        "a": {"fmt": "1", "raw": 1},
        "b": {"fmt": "2", "raw": 2},
    });
    let payload = agon_core::template::encode(&data);
    assert_eq!(decode(&payload).unwrap(), data);
}

#[test]
fn decode_raw_json_roundtrip() {
    assert_eq!(
        decode(r#"[{"id": 1, "name": "Test"}]"#).unwrap(),
        json!([{"id": 1, "name": "Test"}])
    );
}

#[test]
fn decode_invalid_json_raises() {
    let err = decode("{invalid json").unwrap_err();
    assert!(matches!(err, AgonError::InvalidPayload(_)));
    assert!(err.to_string().contains("Invalid JSON"));
}

#[test]
fn decode_non_json_non_agon_raises() {
    let err = decode("this is not json and not AGON").unwrap_err();
    assert!(err.to_string().contains("Invalid JSON"));
}

#[test]
fn decode_result_directly() {
    let data = json!([{"id": 1, "name": "Alice"}]);
    let result = encode(&data, &fixed(Format::Rows)).unwrap();
    assert_eq!(result.decode().unwrap(), data);
}

#[test]
fn decode_as_accepts_headerless_text() {
    let data = json!([{"id": 1, "name": "Alice"}]);
    let result = encode(&data, &fixed(Format::Rows)).unwrap();
    assert_eq!(decode_as(&result.text, result.format).unwrap(), data);
}

#[test]
fn decode_as_tolerates_a_header() {
    let data = json!({"x": 1});
    let payload = agon_core::rows::encode(&data);
    assert_eq!(decode_as(&payload, Format::Rows).unwrap(), data);
}

// ============================================================================
// Adaptive selection
// ============================================================================

#[test]
fn auto_picks_some_candidate() {
    let result = encode(&simple_data(), &EncodeOptions::default()).unwrap();
    assert!(Format::ALL.contains(&result.format));
    assert_eq!(result.decode().unwrap(), simple_data());
}

#[test]
fn force_skips_json_and_breaks_ties_in_order() {
    // All three non-JSON bodies of a one-field object are identical, so the
    // tie-break lands on rows.
    let result = encode(
        &json!({"a": 1}),
        &EncodeOptions {
            force: true,
            ..EncodeOptions::default()
        },
    )
    .unwrap();
    assert_eq!(result.format, Format::Rows);
}

#[test]
fn min_savings_one_forces_json_fallback() {
    let records: Vec<Value> = (0..60).map(|i| json!({"id": i, "name": "Alice"})).collect();
    let result = encode(
        &Value::Array(records),
        &EncodeOptions {
            min_savings: 1.0,
            ..EncodeOptions::default()
        },
    )
    .unwrap();
    assert_eq!(result.format, Format::Json);
    assert!(result.text.starts_with('['));
}

#[test]
fn min_savings_zero_keeps_the_winner() {
    let records: Vec<Value> = (0..60).map(|i| json!({"id": i, "name": "Alice"})).collect();
    let result = encode(
        &Value::Array(records),
        &EncodeOptions {
            min_savings: 0.0,
            ..EncodeOptions::default()
        },
    )
    .unwrap();
    assert_ne!(result.format, Format::Json);
}

#[test]
fn tiny_input_falls_back_to_json() {
    let result = encode(&json!([{"id": 1}]), &EncodeOptions::default()).unwrap();
    assert_eq!(result.format, Format::Json);
}

#[test]
fn force_excludes_json_even_when_it_would_win() {
    let records: Vec<Value> = (0..5).map(|i| json!({"id": i, "name": "Alice"})).collect();
    let result = encode(
        &Value::Array(records),
        &EncodeOptions {
            force: true,
            ..EncodeOptions::default()
        },
    )
    .unwrap();
    assert_ne!(result.format, Format::Json);
}

#[test]
fn auto_beats_or_matches_json_on_repetitive_data() {
    let records: Vec<Value> = (0..40)
        .map(|i| json!({"id": i, "name": format!("User{i}"), "role": "user"}))
        .collect();
    let data = Value::Array(records);
    let auto = encode(&data, &EncodeOptions::default()).unwrap();
    let json = encode(&data, &fixed(Format::Json)).unwrap();
    assert!(auto.len() <= json.len());
    assert_eq!(auto.decode().unwrap(), data);
}

#[test]
fn byte_proxy_and_tokenizer_modes_both_decode() {
    let data = json!([{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]);

    let fast = encode(&data, &EncodeOptions::default()).unwrap();
    assert_eq!(fast.decode().unwrap(), data);

    let counted = encode(
        &data,
        &EncodeOptions {
            encoding: Some("o200k_base".to_string()),
            ..EncodeOptions::default()
        },
    )
    .unwrap();
    assert_eq!(counted.decode().unwrap(), data);
}

#[test]
fn unknown_encoding_fails_encoding() {
    let err = encode(
        &json!([{"id": 1}]),
        &EncodeOptions {
            encoding: Some("no_such_base".to_string()),
            ..EncodeOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, AgonError::EncodingUnavailable(_)));
}

// ============================================================================
// Token counting
// ============================================================================

#[test]
fn count_tokens_positive() {
    assert!(count_tokens("hello world", "o200k_base").unwrap() > 0);
}

#[test]
fn count_tokens_supports_multiple_encodings() {
    let text = "The quick brown fox jumps over the lazy dog.";
    assert!(count_tokens(text, "o200k_base").unwrap() > 0);
    assert!(count_tokens(text, "cl100k_base").unwrap() > 0);
}

#[test]
fn count_tokens_unknown_encoding_is_fatal() {
    assert!(matches!(
        count_tokens("hello", "no_such_base"),
        Err(AgonError::EncodingUnavailable(_))
    ));
}

// ============================================================================
// Result container
// ============================================================================

#[test]
fn result_len_and_str_track_text() {
    let result = encode(&json!([{"id": 1}]), &fixed(Format::Json)).unwrap();
    assert_eq!(result.len(), result.text.len());
    assert_eq!(result.as_str(), result.text);
    assert_eq!(result.to_string(), result.text);
    assert!(!result.is_empty());
}

#[test]
fn with_header_roundtrips_through_autodetect() {
    let data = json!([{"id": 1, "name": "Alice"}]);
    for format in [Format::Rows, Format::Columns, Format::Struct] {
        let result = encode(&data, &fixed(format)).unwrap();
        let headed = result.with_header();
        assert!(headed.starts_with("@AGON "));
        assert_eq!(decode(&headed).unwrap(), data, "format {format}");
    }
}

#[test]
fn with_header_is_identity_for_json() {
    let result = encode(&json!({"a": 1}), &fixed(Format::Json)).unwrap();
    assert_eq!(result.with_header(), result.text);
}

#[test]
fn hints_are_prescriptive_per_format() {
    let data = simple_data();

    let rows = encode(&data, &fixed(Format::Rows)).unwrap();
    assert!(rows.hint().contains("Return in AGON rows format"));
    assert!(rows.hint().contains("@AGON rows header"));
    assert!(rows.hint().contains("name[N]{fields}"));

    let columns = encode(&data, &fixed(Format::Columns)).unwrap();
    assert!(columns.hint().contains("Return in AGON columns format"));
    assert!(columns.hint().contains("@AGON columns header"));
    assert!(columns.hint().contains("├/└"));

    let tmpl = encode(&data, &fixed(Format::Struct)).unwrap();
    assert!(tmpl.hint().contains("Return in AGON struct format"));
    assert!(tmpl.hint().contains("@AGON struct header"));
    assert!(tmpl.hint().contains("@TAG("));

    let json = encode(&data, &fixed(Format::Json)).unwrap();
    assert!(json.hint().contains("JSON"));
}

#[test]
fn format_parses_from_str() {
    assert_eq!("rows".parse::<Format>().unwrap(), Format::Rows);
    assert_eq!("columns".parse::<Format>().unwrap(), Format::Columns);
    assert_eq!("struct".parse::<Format>().unwrap(), Format::Struct);
    assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
    assert!("yaml".parse::<Format>().is_err());
}
