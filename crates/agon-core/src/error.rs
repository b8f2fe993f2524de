//! Error types for AGON encoding and decoding operations.

use thiserror::Error;

/// Errors that can occur while encoding or decoding AGON payloads.
#[derive(Error, Debug)]
pub enum AgonError {
    /// The payload claims to be AGON (or fell through to the JSON path) but
    /// cannot be parsed. The message names the offending construct and, for
    /// body syntax errors, the 1-based line number.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The requested tokenizer encoding is unknown or failed to load.
    /// Always fatal: the selector cannot produce a deterministic cost
    /// without it.
    #[error("Encoding unavailable: {0}")]
    EncodingUnavailable(String),

    /// Serialization of a value to raw JSON failed.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenience alias used throughout agon-core.
pub type Result<T> = std::result::Result<T, AgonError>;
