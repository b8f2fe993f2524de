//! Error types for the trained-schema variant.

use thiserror::Error;

/// Errors raised by training, packing, and unpacking.
///
/// In strict mode every variant below surfaces to the caller; in lenient
/// mode the mismatch/drift/reference cases are swallowed and the malformed
/// region passes through unchanged.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Malformed input: unparsable JSON, non-object training samples, or
    /// user data carrying the reserved missing sentinel.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The packet's anchor does not match the consumer's config.
    #[error("{0}")]
    SchemaMismatch(String),

    /// A packed row has a shape the encoder cannot have produced.
    #[error("Drift detected: {0}")]
    DriftDetected(String),

    /// A dictionary pointer does not resolve in the field's table.
    #[error("{0}")]
    BadReference(String),

    /// Tokenizer failures from the cost model (always fatal).
    #[error(transparent)]
    Token(#[from] agon_core::AgonError),

    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout agon-schema.
pub type Result<T> = std::result::Result<T, SchemaError>;
