//! The external ledger contract.
//!
//! A backend is the narrow surface an authoritative ledger exposes: a
//! handshake, two reads, and a write split into submit and confirm. The
//! [`LedgerClient`](crate::LedgerClient) layers sessions, timeouts and the
//! error taxonomy on top; backends stay thin.

use std::sync::Arc;

use async_trait::async_trait;
use certledger_core::{ContentId, PublicKey, SignedSubmission, TransactionRef};

use crate::error::BackendError;

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// What the ledger tells us about itself on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerInfo {
    /// Human-readable network name.
    pub network: String,
    /// Key allowed to write records.
    pub owner: PublicKey,
}

/// A certificate slot exactly as the ledger returns it.
///
/// Unset slots come back as the zero value (empty strings, `valid = false`)
/// rather than as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCertificate {
    pub recipient: String,
    pub issuer: String,
    pub issued_at: String,
    pub valid: bool,
}

/// Failure reason given to a pending transaction replaced by a newer
/// submission for the same CID.
pub const SUPERSEDED: &str = "superseded by a later submission";

/// Final state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Included in the ledger at `block`.
    Confirmed { block: u64 },
    /// Will never be included.
    Failed { reason: String },
}

/// The ledger contract.
///
/// Implementations must be thread-safe; one backend is shared by every
/// in-flight request.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Identify the ledger and its owner.
    async fn handshake(&self) -> BackendResult<LedgerInfo>;

    /// Fast existence check. May be unsupported.
    async fn certificate_exists(&self, cid: &ContentId) -> BackendResult<bool>;

    /// Read the certificate slot for `cid`.
    async fn read_certificate(&self, cid: &ContentId) -> BackendResult<RawCertificate>;

    /// Hand a signed submission to the ledger. Returns once accepted, not
    /// once final.
    ///
    /// A CID that already has a record is refused with `AlreadyExists`. A
    /// still-pending transaction for the same CID fails with [`SUPERSEDED`]
    /// and the new submission takes its place.
    async fn send_submission(&self, signed: &SignedSubmission) -> BackendResult<TransactionRef>;

    /// Wait for a submitted transaction to finalize.
    async fn await_confirmation(&self, tx: &TransactionRef) -> BackendResult<Confirmation>;
}

#[async_trait]
impl<B: LedgerBackend + ?Sized> LedgerBackend for Arc<B> {
    async fn handshake(&self) -> BackendResult<LedgerInfo> {
        (**self).handshake().await
    }

    async fn certificate_exists(&self, cid: &ContentId) -> BackendResult<bool> {
        (**self).certificate_exists(cid).await
    }

    async fn read_certificate(&self, cid: &ContentId) -> BackendResult<RawCertificate> {
        (**self).read_certificate(cid).await
    }

    async fn send_submission(&self, signed: &SignedSubmission) -> BackendResult<TransactionRef> {
        (**self).send_submission(signed).await
    }

    async fn await_confirmation(&self, tx: &TransactionRef) -> BackendResult<Confirmation> {
        (**self).await_confirmation(tx).await
    }
}
