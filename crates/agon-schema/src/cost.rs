//! Token-cost model for training and the packet-versus-JSON gate.
//!
//! Dictionary admission compares the token price of a literal against its
//! pointer, one fragment at a time. Those fragments repeat heavily across a
//! training corpus, so counts for small texts are memoized in a process-wide
//! LRU; large texts (whole packets) are counted directly.

use crate::error::Result;
use agon_core::DEFAULT_ENCODING;
use lru::LruCache;
use once_cell::sync::Lazy;
use std::num::NonZeroUsize;
use std::sync::Mutex;

const CACHE_CAPACITY: usize = 4096;

/// Fragments longer than this bypass the cache.
const CACHE_MAX_LEN: usize = 128;

static COST_CACHE: Lazy<Mutex<LruCache<String, usize>>> = Lazy::new(|| {
    let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(capacity))
});

/// Token count of `text` under the default encoding, memoized for small
/// fragments.
pub(crate) fn token_cost(text: &str) -> Result<usize> {
    if text.len() > CACHE_MAX_LEN {
        return Ok(agon_core::count_tokens(text, DEFAULT_ENCODING)?);
    }
    if let Ok(mut cache) = COST_CACHE.lock() {
        if let Some(&count) = cache.get(text) {
            return Ok(count);
        }
    }
    let count = agon_core::count_tokens(text, DEFAULT_ENCODING)?;
    if let Ok(mut cache) = COST_CACHE.lock() {
        cache.put(text.to_string(), count);
    }
    Ok(count)
}
