//! # agon-schema
//!
//! The trained-schema AGON variant: induce a schema from sample payloads
//! once, anchor it with a SHA-256 prefix, and exchange positional packets
//! that elide keys entirely.
//!
//! Where the `agon-core` formats are self-describing, this variant moves the
//! schema out of band. Training classifies every key (`scalar`, `str`,
//! `dict`, `obj`, `list`), orders keys densest-first so sparse fields
//! truncate off the end of each row, and upgrades repetitive string fields
//! to dictionary tables when the token math pays for them. The anchor binds
//! encoder and decoder to the exact same schema; a coverage gate falls back
//! to raw JSON whenever data outgrows what was trained.
//!
//! ## Quick start
//!
//! ```rust
//! use agon_schema::{decode_trained, encode_trained, train, TrainOptions};
//! use serde_json::json;
//!
//! let samples = vec![
//!     json!({"id": 1, "name": "Alice", "role": "admin"}),
//!     json!({"id": 2, "name": "Bob", "role": "user"}),
//! ];
//! let config = train(&samples, "users", &TrainOptions::default()).unwrap();
//!
//! let data = json!([{"id": 3, "name": "Carol", "role": "user"}]);
//! let packet = encode_trained(&data, &config, true).unwrap();
//! assert_eq!(decode_trained(&packet, &config, true).unwrap(), data);
//! ```
//!
//! ## Modules
//!
//! - [`train`](mod@train) — schema induction and dictionary admission
//! - [`pack`] — packet encode/decode with coverage and drift guards
//! - [`emit`] — JSON Schema and system-prompt generation
//! - [`schema`] — data model, canonical JSON, anchor
//! - [`error`] — error taxonomy

pub mod emit;
pub mod error;
pub mod pack;
pub mod schema;
pub mod train;

pub(crate) mod cost;

pub use emit::{json_schema, system_prompt};
pub use error::{Result, SchemaError};
pub use pack::{decode_trained, encode_trained};
pub use schema::{Config, FieldType, SchemaNode};
pub use train::{train, TrainOptions};
