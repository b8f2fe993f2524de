//! Tests for keep-path projection.

use agon_core::project_data;
use serde_json::json;

#[test]
fn keeps_a_top_level_key() {
    let data = vec![json!({"type": "DAY_GAINERS", "description": "x", "value": 100})];
    assert_eq!(
        project_data(&data, &["type"]),
        vec![json!({"type": "DAY_GAINERS"})]
    );
}

#[test]
fn keeps_multiple_keys() {
    let data = vec![json!({"id": 1, "name": "Alice", "role": "admin", "extra": "ignored"})];
    assert_eq!(
        project_data(&data, &["id", "name"]),
        vec![json!({"id": 1, "name": "Alice"})]
    );
}

#[test]
fn keeps_nested_paths() {
    let data = vec![json!({
        "user": {"profile": {"name": "Ada", "age": 37}, "id": 123},
        "type": "x",
    })];
    assert_eq!(
        project_data(&data, &["user.profile.name"]),
        vec![json!({"user": {"profile": {"name": "Ada"}}})]
    );
}

#[test]
fn paths_apply_through_arrays() {
    let data = vec![json!({
        "type": "DAY_GAINERS",
        "quotes": [
            {"symbol": "DJTWW", "exchange": "NYQ", "price": 10.37},
            {"symbol": "AAPL", "exchange": "NMS", "price": 199.0},
        ],
    })];
    assert_eq!(
        project_data(&data, &["quotes.symbol"]),
        vec![json!({"quotes": [{"symbol": "DJTWW"}, {"symbol": "AAPL"}]})]
    );
}

#[test]
fn preserves_explicit_null() {
    let data = vec![json!({"id": 1, "name": null})];
    assert_eq!(
        project_data(&data, &["id", "name"]),
        vec![json!({"id": 1, "name": null})]
    );
}

#[test]
fn missing_keys_are_ignored() {
    let data = vec![json!({"id": 1})];
    assert_eq!(project_data(&data, &["id", "nonexistent"]), vec![json!({"id": 1})]);
}

#[test]
fn empty_paths_and_segments_are_discarded() {
    let data = vec![json!({
        "id": 1,
        "user": {"name": "Alice", "age": 30},
        "users": [{"name": "Bob", "age": 20}],
        "extra": "x",
    })];
    let projected = project_data(
        &data,
        &["", ".", "user.name", "users.name", "user..age"],
    );
    assert_eq!(
        projected,
        vec![json!({
            "user": {"name": "Alice", "age": 30},
            "users": [{"name": "Bob"}],
        })]
    );
}

#[test]
fn deeper_path_wins_a_collision() {
    let data = vec![json!({"a": {"b": 1, "c": 2}, "x": 9})];
    assert_eq!(
        project_data(&data, &["a", "a.b"]),
        vec![json!({"a": {"b": 1}})]
    );
}

#[test]
fn non_objects_under_a_path_pass_through() {
    let data = vec![json!({
        "users": [],
        "mixed": [{"name": "Alice"}, "oops"],
        "user": "not-an-object",
    })];
    let projected = project_data(&data, &["users.name", "mixed.name", "user.name"]);
    assert_eq!(
        projected,
        vec![json!({
            "users": [],
            "mixed": [{"name": "Alice"}, "oops"],
            "user": "not-an-object",
        })]
    );
}

#[test]
fn no_usable_paths_is_a_no_op() {
    let data = vec![json!({"id": 1, "name": "Alice"})];
    assert_eq!(project_data(&data, &[]), data);
    assert_eq!(project_data(&data, &["", "."]), data);
}

#[test]
fn key_order_follows_the_source() {
    let data = vec![json!({"c": 3, "a": 1, "b": 2})];
    let projected = project_data(&data, &["a", "c"]);
    let keys: Vec<&String> = projected[0].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["c", "a"]);
}
