//! Error types for the ledger client and its backends.

use std::time::Duration;

use certledger_core::ContentId;
use thiserror::Error;

/// Errors a ledger backend reports for a single call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The ledger could not be reached.
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    /// The call was executed and reverted.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// The ledger answered with data that could not be decoded.
    #[error("bad data: {0}")]
    BadData(String),

    /// The ledger does not offer this call.
    #[error("unsupported call: {0}")]
    Unsupported(String),

    /// A record for this CID already exists on the ledger.
    #[error("certificate already exists: {0}")]
    AlreadyExists(ContentId),

    /// The submission signer is not allowed to write.
    #[error("unauthorized signer: {0}")]
    Unauthorized(String),

    /// Local database failure (SQLite backend).
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Errors surfaced by [`LedgerClient`](crate::LedgerClient).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No session, or the ledger did not answer.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A ledger call exceeded its time budget.
    #[error("ledger {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The ledger answered with undecodable or reverted data.
    #[error("malformed ledger response: {0}")]
    MalformedResponse(String),

    /// The ledger already holds a record for this CID.
    #[error("ledger already holds a record for {0}")]
    AlreadyRecorded(ContentId),

    /// The write was accepted but did not finalize.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// The ledger refused our credential.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The ledger does not support the requested call.
    #[error("unsupported ledger call: {0}")]
    Unsupported(String),
}

impl LedgerError {
    /// Whether retrying later, without changing the request, may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

impl From<BackendError> for LedgerError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unreachable(msg) => Self::Unavailable(msg),
            BackendError::Database(e) => Self::Unavailable(e.to_string()),
            BackendError::Reverted(msg) | BackendError::BadData(msg) => Self::MalformedResponse(msg),
            BackendError::Unsupported(msg) => Self::Unsupported(msg),
            BackendError::AlreadyExists(cid) => Self::AlreadyRecorded(cid),
            BackendError::Unauthorized(msg) => Self::Rejected(msg),
        }
    }
}

/// Result type for ledger client operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
