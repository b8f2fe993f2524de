//! Pluggable token counting.
//!
//! The adaptive selector and the trained variant's cost model both measure
//! candidate texts in tokens. Tokenizer instances are expensive to build, so
//! they are constructed lazily and memoized process-wide, keyed by encoding
//! name. The cache sits behind a read/write lock: counting is read-mostly
//! and safe to call from the selector's parallel candidate encoders.

use crate::error::{AgonError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tiktoken_rs::CoreBPE;

/// Encoding used when callers do not specify one.
pub const DEFAULT_ENCODING: &str = "o200k_base";

static TOKENIZERS: Lazy<RwLock<HashMap<String, Arc<CoreBPE>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Count the tokens of `text` under the named tiktoken encoding.
///
/// # Errors
///
/// [`AgonError::EncodingUnavailable`] if the encoding is unknown or its
/// vocabulary fails to load. This is fatal by design: a selector running on
/// a half-loaded tokenizer would produce nondeterministic costs.
pub fn count_tokens(text: &str, encoding: &str) -> Result<usize> {
    let bpe = tokenizer(encoding)?;
    Ok(bpe.encode_with_special_tokens(text).len())
}

/// Cost of a candidate text: token count under `encoding`, or byte length as
/// the fast proxy when no encoding is requested.
pub(crate) fn cost(text: &str, encoding: Option<&str>) -> Result<usize> {
    match encoding {
        Some(name) => count_tokens(text, name),
        None => Ok(text.len()),
    }
}

fn tokenizer(encoding: &str) -> Result<Arc<CoreBPE>> {
    if let Ok(cache) = TOKENIZERS.read() {
        if let Some(bpe) = cache.get(encoding) {
            return Ok(Arc::clone(bpe));
        }
    }
    let bpe = Arc::new(load(encoding)?);
    if let Ok(mut cache) = TOKENIZERS.write() {
        cache.insert(encoding.to_string(), Arc::clone(&bpe));
    }
    Ok(bpe)
}

fn load(encoding: &str) -> Result<CoreBPE> {
    let built = match encoding {
        "o200k_base" => tiktoken_rs::o200k_base(),
        "cl100k_base" => tiktoken_rs::cl100k_base(),
        "p50k_base" => tiktoken_rs::p50k_base(),
        "p50k_edit" => tiktoken_rs::p50k_edit(),
        "r50k_base" | "gpt2" => tiktoken_rs::r50k_base(),
        other => {
            return Err(AgonError::EncodingUnavailable(format!(
                "unknown encoding {other:?}"
            )))
        }
    };
    built.map_err(|e| AgonError::EncodingUnavailable(format!("{encoding}: {e}")))
}
