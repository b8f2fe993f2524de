//! Tests for the consumer-facing artifacts: strict JSON Schema emission and
//! the compact system prompt.

use agon_schema::{json_schema, system_prompt, train, Config, TrainOptions};
use serde_json::{json, Value};

fn config() -> Config {
    let samples: Vec<Value> = (0..20)
        .map(|i| {
            let status = if i % 2 == 0 {
                "order_filled_completely"
            } else {
                "order_cancelled_by_user"
            };
            json!({
                "id": i,
                "status": status,
                "user": {"name": format!("u{i}"), "email": format!("u{i}@x.com")},
                "tags": [{"label": "a"}],
            })
        })
        .collect();
    train(&samples, "orders", &TrainOptions::default()).unwrap()
}

// ============================================================================
// JSON Schema
// ============================================================================

#[test]
fn schema_envelope_is_strict() {
    let schema = json_schema(&config());
    assert_eq!(schema["type"], json!("object"));
    assert_eq!(schema["additionalProperties"], json!(false));
    assert_eq!(schema["required"], json!(["_f", "c", "v", "d"]));
    assert_eq!(schema["properties"]["_f"]["const"], json!("a"));
    assert_eq!(schema["properties"]["c"]["const"], json!("orders"));
    assert_eq!(
        schema["properties"]["v"]["const"],
        json!(config().v)
    );
}

#[test]
fn rows_are_prefix_item_tuples() {
    let cfg = config();
    let schema = json_schema(&cfg);
    let row = &schema["properties"]["d"]["items"];
    assert_eq!(row["type"], json!("array"));
    assert_eq!(row["items"], json!(false));
    let prefix = row["prefixItems"].as_array().unwrap();
    assert_eq!(prefix.len(), cfg.schema.keys.len());
    assert_eq!(row["maxItems"], json!(cfg.schema.keys.len()));
}

#[test]
fn every_cell_admits_sentinel_and_null() {
    let schema = json_schema(&config());
    let prefix = schema["properties"]["d"]["items"]["prefixItems"]
        .as_array()
        .unwrap();
    for cell in prefix {
        let any_of = cell["anyOf"].as_array().unwrap();
        assert!(any_of.len() >= 3);
        assert_eq!(any_of[0]["properties"]["_m"]["const"], json!(1));
        assert_eq!(any_of[1], json!({"type": "null"}));
    }
}

#[test]
fn dict_cells_admit_negative_pointers() {
    let cfg = config();
    let schema = json_schema(&cfg);
    let idx = cfg.schema.keys.iter().position(|k| k == "status").unwrap();
    let cell = &schema["properties"]["d"]["items"]["prefixItems"][idx];
    let any_of = cell["anyOf"].as_array().unwrap();
    assert!(any_of
        .iter()
        .any(|s| s["type"] == json!("integer") && s["maximum"] == json!(-1)));
    assert!(any_of.iter().any(|s| s["type"] == json!("string")));
}

#[test]
fn nested_fields_recurse_into_sub_rows() {
    let cfg = config();
    let schema = json_schema(&cfg);
    let prefix = schema["properties"]["d"]["items"]["prefixItems"]
        .as_array()
        .unwrap();

    let user_idx = cfg.schema.keys.iter().position(|k| k == "user").unwrap();
    let user_any = prefix[user_idx]["anyOf"].as_array().unwrap();
    let sub_row = user_any.last().unwrap();
    assert_eq!(sub_row["type"], json!("array"));
    assert_eq!(
        sub_row["prefixItems"].as_array().unwrap().len(),
        cfg.schema.subs["user"].keys.len()
    );

    let tags_idx = cfg.schema.keys.iter().position(|k| k == "tags").unwrap();
    let tags_any = prefix[tags_idx]["anyOf"].as_array().unwrap();
    let list_schema = tags_any.last().unwrap();
    assert_eq!(list_schema["type"], json!("array"));
    assert_eq!(list_schema["items"]["type"], json!("array"));
}

// ============================================================================
// System prompt
// ============================================================================

#[test]
fn prompt_names_the_anchor() {
    let cfg = config();
    let prompt = system_prompt(&cfg);
    assert!(prompt.contains(&cfg.cid));
    assert!(prompt.contains(&cfg.v));
    assert!(prompt.contains("\"_f\":\"a\""));
}

#[test]
fn prompt_lists_keys_for_every_level() {
    let cfg = config();
    let prompt = system_prompt(&cfg);
    assert!(prompt.contains(&format!("fields: {}", cfg.schema.keys.join(", "))));
    assert!(prompt.contains("user fields:"));
    assert!(prompt.contains("tags fields:"));
}

#[test]
fn prompt_spells_out_dictionary_tables() {
    let prompt = system_prompt(&config());
    assert!(prompt.contains("status dict:"));
    assert!(prompt.contains("-1=order_filled_completely"));
    assert!(prompt.contains("-2=order_cancelled_by_user"));
}

#[test]
fn prompt_mentions_the_missing_sentinel() {
    let prompt = system_prompt(&config());
    assert!(prompt.contains("{\"_m\":1}"));
}

#[test]
fn prompt_stays_compact() {
    let prompt = system_prompt(&config());
    assert!(prompt.len() < 800, "prompt too long:\n{prompt}");
    assert!(agon_core::count_tokens(&prompt, "o200k_base").unwrap() < 200);
}
