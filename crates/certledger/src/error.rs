//! Error types for the issuance and verification workflows.

use std::fmt;

use certledger_core::{ContentId, ReadError};
use certledger_ledger::LedgerError;
use thiserror::Error;

/// Workflow step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fingerprint,
    DuplicateCheck,
    Stage,
    LedgerRead,
    LedgerWrite,
    Persist,
    Render,
    /// The workflow task itself died.
    Task,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::DuplicateCheck => "duplicate_check",
            Self::Stage => "stage",
            Self::LedgerRead => "ledger_read",
            Self::LedgerWrite => "ledger_write",
            Self::Persist => "persist",
            Self::Render => "render",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from issuing a certificate.
#[derive(Debug, Error)]
pub enum IssueError {
    /// No credentials presented.
    #[error("authentication required")]
    Unauthenticated,

    /// Credentials presented but not good enough to issue.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Missing or empty form fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upload could not be fully read.
    #[error("could not read upload: {0}")]
    Read(#[from] ReadError),

    /// A record for this content already exists.
    #[error("certificate with this content already exists: {0}")]
    DuplicateContent(ContentId),

    /// The ledger could not be reached or did not answer in time.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(#[source] LedgerError),

    /// Anything else, tagged with the step that failed.
    #[error("issuance failed at {step}: {message}")]
    Internal { step: Step, message: String },
}

impl IssueError {
    pub(crate) fn internal(step: Step, err: impl fmt::Display) -> Self {
        Self::Internal {
            step,
            message: err.to_string(),
        }
    }

    /// Classify a ledger failure seen at `step`.
    pub(crate) fn from_ledger(step: Step, err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyRecorded(cid) => Self::DuplicateContent(cid),
            e if e.is_retryable() => Self::LedgerUnavailable(e),
            e => Self::internal(step, e),
        }
    }
}

/// Errors from verifying a document.
///
/// Ledger failures are not errors here; they land in the verdict.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("could not read upload: {0}")]
    Read(#[from] ReadError),

    #[error("verification failed at {step}: {message}")]
    Internal { step: Step, message: String },
}

/// Errors from rendering the scannable payload.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("payload too large to render: {len} bytes (limit {limit})")]
    TooLarge { len: usize, limit: usize },

    #[error("render failed: {0}")]
    Failed(String),
}

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors from starting the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("evidence store: {0}")]
    Evidence(#[from] certledger_evidence::EvidenceError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ledger_classification() {
        let cid = ContentId::of_bytes(b"x");
        assert!(matches!(
            IssueError::from_ledger(Step::LedgerWrite, LedgerError::AlreadyRecorded(cid)),
            IssueError::DuplicateContent(c) if c == cid
        ));
        assert!(matches!(
            IssueError::from_ledger(Step::LedgerWrite, LedgerError::Unavailable("down".into())),
            IssueError::LedgerUnavailable(_)
        ));
        assert!(matches!(
            IssueError::from_ledger(
                Step::LedgerWrite,
                LedgerError::Timeout {
                    operation: "await_confirmation",
                    after: Duration::from_secs(1)
                }
            ),
            IssueError::LedgerUnavailable(_)
        ));
        assert!(matches!(
            IssueError::from_ledger(Step::LedgerWrite, LedgerError::Rejected("nope".into())),
            IssueError::Internal {
                step: Step::LedgerWrite,
                ..
            }
        ));
    }
}
