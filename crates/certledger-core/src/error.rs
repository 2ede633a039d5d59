//! Error types for certledger core.

use thiserror::Error;

/// Core errors for identifiers, encodings and signatures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("unsupported content identifier version: {0}")]
    UnsupportedCidVersion(u8),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Failure to consume an uploaded document in full.
///
/// Any of these aborts the surrounding workflow; no content identifier is
/// produced from partial input.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The underlying stream failed.
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before the declared length was reached.
    #[error("upload truncated: expected {expected} bytes, read {actual}")]
    Truncated { expected: u64, actual: u64 },

    /// The stream carried more bytes than it declared.
    #[error("upload overran declared length: expected {expected} bytes, read more")]
    Overrun { expected: u64 },

    /// The stream exceeded the configured size limit.
    #[error("upload exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    /// Reading did not finish within the allotted time.
    #[error("upload read timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
