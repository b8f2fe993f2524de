//! # agon-core
//!
//! Pure-Rust encoder and decoder family for **AGON (Adaptive Guarded Object
//! Notation)**, a set of token-efficient text encodings for JSON-shaped data
//! aimed at LLM consumption.
//!
//! AGON keeps raw JSON as its baseline and adds three self-describing
//! layouts: a row-oriented format (`@AGON rows`), a column-oriented format
//! (`@AGON columns`), and a template factorization for repeated object
//! shapes (`@AGON struct`). An adaptive selector encodes into every
//! candidate, measures each in tokens (or bytes as a fast proxy), and keeps
//! the cheapest one, falling back to JSON when the savings do not clear a
//! configurable threshold.
//!
//! ## Quick start
//!
//! ```rust
//! use agon_core::{decode, encode, EncodeOptions, Format};
//! use serde_json::json;
//!
//! let data = json!([
//!     {"id": 1, "name": "Alice", "role": "admin"},
//!     {"id": 2, "name": "Bob", "role": "user"},
//! ]);
//!
//! let result = encode(&data, &EncodeOptions {
//!     format: Some(Format::Rows),
//!     ..EncodeOptions::default()
//! }).unwrap();
//! assert_eq!(result.header.as_deref(), Some("@AGON rows"));
//!
//! // A headed payload decodes by prefix detection.
//! assert_eq!(decode(&result.with_header()).unwrap(), data);
//! ```
//!
//! ## Modules
//!
//! - [`encode`](mod@encode) — adaptive selector and per-format dispatch
//! - [`decode`](mod@decode) — header-prefix multiplexer with JSON fallback
//! - [`rows`] / [`columns`] / [`template`] — the three non-JSON codecs
//! - [`project`] — keep-path projection for trimming payloads up front
//! - [`tokenizer`] — cached tiktoken adapter used for cost measurement
//! - [`types`] — [`Format`] and the [`EncodingResult`] container
//! - [`error`] — error taxonomy

pub mod columns;
pub mod decode;
pub mod encode;
pub mod error;
pub mod project;
pub mod rows;
pub mod template;
pub mod tokenizer;
pub mod types;

pub(crate) mod value;

pub use decode::{decode, decode_as};
pub use encode::{encode, encode_as, EncodeOptions};
pub use error::{AgonError, Result};
pub use project::project_data;
pub use tokenizer::{count_tokens, DEFAULT_ENCODING};
pub use types::{EncodingResult, Format};
