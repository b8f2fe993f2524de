//! Tests for the `@AGON struct` codec: shape detection, template tags,
//! positional references, and fallback layouts.

use agon_core::template::{decode, encode};
use serde_json::{json, Value};

fn assert_roundtrip(value: Value) {
    let payload = encode(&value);
    let decoded = decode(&payload).expect("decode failed");
    assert_eq!(
        decoded, value,
        "struct roundtrip failed:\n  payload:\n{payload}"
    );
}

// ============================================================================
// Template factorization
// ============================================================================

#[test]
fn repeated_shape_becomes_template() {
    let data = json!({
        "price": {"fmt": "100.00", "raw": 100.0},
        "change": {"fmt": "+5.00", "raw": 5.0},
        "volume": {"fmt": "1M", "raw": 1000000},
    });
    let payload = encode(&data);
    assert!(payload.starts_with("@AGON struct\n\n"));
    assert!(payload.contains("@FR: fmt, raw"));
    assert!(payload.contains("price @FR(\"100.00\", 100.0)"));
    assert!(payload.contains("change @FR(\"+5.00\", 5.0)"));
    assert_eq!(decode(&payload).unwrap(), data);
}

#[test]
fn tag_letters_come_from_sorted_keys() {
    // Insertion order raw-then-fmt still yields the FR tag.
    let data = json!({
        "a": {"raw": 1, "fmt": "1"},
        "b": {"raw": 2, "fmt": "2"},
    });
    let payload = encode(&data);
    assert!(payload.contains("@FR: fmt, raw"));
}

#[test]
fn unique_shape_stays_inline() {
    let data = json!({
        "price": {"fmt": "100.00", "raw": 100.0},
        "meta": {"source": "api"},
    });
    let payload = encode(&data);
    // Neither shape repeats, so there is no preamble at all.
    assert!(!payload.contains("@FR"));
    assert!(payload.contains("price:"));
    assert!(payload.contains("  fmt: \"100.00\""));
    assert_eq!(decode(&payload).unwrap(), data);
}

#[test]
fn distinct_shapes_get_distinct_tags() {
    let data = json!({
        "p1": {"fmt": "1", "raw": 1},
        "p2": {"fmt": "2", "raw": 2},
        "r1": {"from": "a", "rate": 1.5},
        "r2": {"from": "b", "rate": 2.5},
    });
    let payload = encode(&data);
    assert!(payload.contains("@FR: fmt, raw"));
    // {from, rate} collides on FR and takes the numbered tag.
    assert!(payload.contains("@FR2: from, rate"));
    assert_eq!(decode(&payload).unwrap(), data);
}

#[test]
fn list_items_use_references() {
    let data = json!([
        {"id": 1, "name": "Alice", "role": "admin"},
        {"id": 2, "name": "Bob", "role": "user"},
    ]);
    let payload = encode(&data);
    assert!(payload.contains("@INR: id, name, role"));
    assert!(payload.contains("- @INR(1, Alice, admin)"));
    assert!(payload.contains("- @INR(2, Bob, user)"));
    assert_eq!(decode(&payload).unwrap(), data);
}

#[test]
fn shapes_with_nested_values_are_not_templated() {
    // {user} values are objects, so the outer shape cannot pack
    // positionally; the inner {email, name} shape repeats and can.
    let data = json!([
        {"user": {"name": "Alice", "email": "a@x.com"}},
        {"user": {"name": "Bob", "email": "b@x.com"}},
    ]);
    let payload = encode(&data);
    assert!(payload.contains("@EN: email, name"));
    assert!(payload.contains("user @EN("));
    assert_eq!(decode(&payload).unwrap(), data);
}

// ============================================================================
// Decoding fixed payloads
// ============================================================================

#[test]
fn decode_reference_payload() {
    let payload = "@AGON struct\n@FR: fmt, raw\n\nprice @FR(\"100.00\", 100.0)\nchange @FR(\"+5.00\", 5.0)\n";
    assert_eq!(
        decode(payload).unwrap(),
        json!({
            "price": {"fmt": "100.00", "raw": 100.0},
            "change": {"fmt": "+5.00", "raw": 5.0},
        })
    );
}

#[test]
fn decode_tolerates_blank_line_before_preamble() {
    // with_header() output puts a blank line between header and preamble.
    let payload = "@AGON struct\n\n@FR: fmt, raw\n\nprice @FR(\"1.00\", 1.0)\nchange @FR(\"2.00\", 2.0)\n";
    assert_eq!(
        decode(payload).unwrap(),
        json!({
            "price": {"fmt": "1.00", "raw": 1.0},
            "change": {"fmt": "2.00", "raw": 2.0},
        })
    );
}

#[test]
fn unknown_template_is_rejected() {
    let payload = "@AGON struct\n\nprice @ZZ(1, 2)\n";
    let err = decode(payload).unwrap_err();
    assert!(err.to_string().contains("Unknown template"));
}

#[test]
fn invalid_header_is_rejected() {
    assert!(decode("not a valid header").is_err());
    assert!(decode("").is_err());
}

// ============================================================================
// Quoting inside references
// ============================================================================

#[test]
fn arguments_quote_commas_and_parens() {
    let data = json!({
        "a": {"fmt": "1,5", "raw": 1.5},
        "b": {"fmt": "(2)", "raw": 2.0},
    });
    let payload = encode(&data);
    assert!(payload.contains("@FR(\"1,5\", 1.5)"));
    assert!(payload.contains("@FR(\"(2)\", 2.0)"));
    assert_eq!(decode(&payload).unwrap(), data);
}

#[test]
fn null_arguments_roundtrip() {
    assert_roundtrip(json!({
        "a": {"fmt": null, "raw": 1},
        "b": {"fmt": "x", "raw": null},
    }));
}

// ============================================================================
// Rows-style fallback body
// ============================================================================

#[test]
fn plain_objects_and_arrays_roundtrip() {
    assert_roundtrip(json!({"name": "Alice", "age": 30}));
    assert_roundtrip(json!({"tags": ["a", "b", "c"]}));
    assert_roundtrip(json!({
        "company": {"name": "ACME", "address": {"city": "Seattle"}},
    }));
    assert_roundtrip(json!({}));
}

#[test]
fn mixed_payload_roundtrip() {
    assert_roundtrip(json!({
        "symbol": "AAPL",
        "price": {"fmt": "190.00", "raw": 190.0},
        "change": {"fmt": "-1.25", "raw": -1.25},
        "days": [1, 2, 3],
        "notes": [
            {"text": "earnings", "level": "info"},
            {"text": "split", "level": "info"},
        ],
    }));
}

#[test]
fn header_stays_out_of_reencoded_text() {
    let data = json!({
        "a": {"fmt": "1", "raw": 1},
        "b": {"fmt": "2", "raw": 2},
    });
    let payload = encode(&data);
    // Exactly one header line at the top.
    assert_eq!(payload.matches("@AGON struct").count(), 1);
}
