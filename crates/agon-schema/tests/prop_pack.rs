//! Property-based tests for the trained variant: training on a corpus and
//! force-encoding that same corpus must always roundtrip, whatever mix of
//! present, missing, and null fields the generator produces.

use agon_schema::{decode_trained, encode_trained, train, TrainOptions};
use proptest::prelude::*;
use serde_json::{Map, Value};

const KEY_POOL: [&str; 5] = ["id", "name", "status", "score", "note"];

fn arb_primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-10_000i64..10_000i64).prop_map(Value::from),
        prop::string::string_regex("[a-zA-Z0-9_ ]{0,12}")
            .unwrap()
            .prop_map(Value::String),
        prop_oneof![
            Just("active".to_string()),
            Just("inactive".to_string()),
            Just("pending_review".to_string()),
        ]
        .prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

/// One sample object: a subset of the key pool with primitive values.
fn arb_object() -> impl Strategy<Value = Value> {
    prop::collection::vec((0usize..KEY_POOL.len(), arb_primitive()), 0..5).prop_map(|pairs| {
        let mut map = Map::new();
        for (idx, value) in pairs {
            map.insert(KEY_POOL[idx].to_string(), value);
        }
        Value::Object(map)
    })
}

fn arb_corpus() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(arb_object(), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Training on a corpus always covers that corpus, so force-encoding it
    /// yields a packet that decodes back exactly.
    #[test]
    fn trained_corpus_roundtrips(samples in arb_corpus()) {
        let config = train(&samples, "prop", &TrainOptions::default()).unwrap();
        let data = Value::Array(samples);
        let packet = encode_trained(&data, &config, true).unwrap();
        prop_assert!(packet.contains("\"_f\":\"a\""));
        let decoded = decode_trained(&packet, &config, true).unwrap();
        prop_assert_eq!(decoded, data);
    }

    /// The anchor is a pure function of the samples.
    #[test]
    fn anchor_is_deterministic(samples in arb_corpus()) {
        let a = train(&samples, "prop", &TrainOptions::default()).unwrap();
        let b = train(&samples, "prop", &TrainOptions::default()).unwrap();
        prop_assert_eq!(a.v, b.v);
    }

    /// Adaptive encoding (no force) always produces something the decoder
    /// accepts, packet or raw JSON alike.
    #[test]
    fn adaptive_output_always_decodes(samples in arb_corpus()) {
        let config = train(&samples, "prop", &TrainOptions::default()).unwrap();
        let data = Value::Array(samples);
        let out = encode_trained(&data, &config, false).unwrap();
        let decoded = decode_trained(&out, &config, true).unwrap();
        prop_assert_eq!(decoded, data);
    }
}
