//! In-memory implementation of the ledger contract.
//!
//! Same semantics as [`SqliteLedger`](crate::SqliteLedger), no persistence.
//! Carries fault toggles so tests can exercise every degraded path the
//! client has to cope with.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;

use certledger_core::{CertificateRecord, ContentId, PublicKey, SignedSubmission, TransactionRef};

use crate::backend::{
    BackendResult, Confirmation, LedgerBackend, LedgerInfo, RawCertificate, SUPERSEDED,
};
use crate::error::BackendError;

/// Injectable misbehaviour.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Every call fails as unreachable.
    pub unreachable: bool,
    /// `certificate_exists` is not offered.
    pub exists_unsupported: bool,
    /// Reads pad string fields with whitespace.
    pub pad_fields: bool,
    /// Reads fail as undecodable.
    pub corrupt_reads: bool,
    /// Reads revert.
    pub revert_reads: bool,
    /// Confirmations report failure.
    pub fail_confirmations: bool,
    /// Confirmations stall for this long before answering.
    pub confirmation_delay: Option<Duration>,
}

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

struct Inner {
    owner: PublicKey,
    network: String,
    records: HashMap<ContentId, CertificateRecord>,
    pending: HashMap<TransactionRef, SignedSubmission>,
    confirmed: HashMap<TransactionRef, u64>,
    failed: HashMap<TransactionRef, String>,
    height: u64,
    submissions: u64,
    faults: Faults,
}

impl MemoryLedger {
    /// Create an empty ledger owned by `owner`.
    pub fn new(owner: PublicKey) -> Self {
        Self {
            inner: RwLock::new(Inner {
                owner,
                network: "memory".to_owned(),
                records: HashMap::new(),
                pending: HashMap::new(),
                confirmed: HashMap::new(),
                failed: HashMap::new(),
                height: 0,
                submissions: 0,
                faults: Faults::default(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the active fault set.
    pub fn set_faults(&self, faults: Faults) {
        self.write().faults = faults;
    }

    /// Adjust the active fault set in place.
    pub fn update_faults(&self, f: impl FnOnce(&mut Faults)) {
        f(&mut self.write().faults);
    }

    /// Toggle reachability.
    pub fn set_reachable(&self, reachable: bool) {
        self.write().faults.unreachable = !reachable;
    }

    /// Number of finalized records.
    pub fn record_count(&self) -> usize {
        self.read().records.len()
    }

    /// Number of transactions still waiting for confirmation.
    pub fn pending_count(&self) -> usize {
        self.read().pending.len()
    }

    /// Number of submissions accepted (pending or final).
    pub fn submission_count(&self) -> u64 {
        self.read().submissions
    }

    /// The stored record for `cid`, bypassing every fault.
    pub fn record(&self, cid: &ContentId) -> Option<CertificateRecord> {
        self.read().records.get(cid).cloned()
    }

    /// Mark a record invalid. Returns whether it existed.
    pub fn invalidate(&self, cid: &ContentId) -> bool {
        match self.write().records.get_mut(cid) {
            Some(record) => {
                record.valid = false;
                true
            }
            None => false,
        }
    }

    /// Insert a finalized record directly.
    pub fn seed(&self, record: CertificateRecord) {
        let mut inner = self.write();
        inner.height += 1;
        inner.records.insert(record.cid, record);
    }

    fn check_reachable(&self) -> BackendResult<()> {
        if self.read().faults.unreachable {
            Err(BackendError::Unreachable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerBackend for MemoryLedger {
    async fn handshake(&self) -> BackendResult<LedgerInfo> {
        self.check_reachable()?;
        let inner = self.read();
        Ok(LedgerInfo {
            network: inner.network.clone(),
            owner: inner.owner,
        })
    }

    async fn certificate_exists(&self, cid: &ContentId) -> BackendResult<bool> {
        self.check_reachable()?;
        let inner = self.read();
        if inner.faults.exists_unsupported {
            return Err(BackendError::Unsupported("certificateExists".into()));
        }
        Ok(inner.records.contains_key(cid))
    }

    async fn read_certificate(&self, cid: &ContentId) -> BackendResult<RawCertificate> {
        self.check_reachable()?;
        let inner = self.read();
        if inner.faults.corrupt_reads {
            return Err(BackendError::BadData("could not decode result data".into()));
        }
        if inner.faults.revert_reads {
            return Err(BackendError::Reverted("require(false)".into()));
        }

        let Some(record) = inner.records.get(cid) else {
            return Ok(RawCertificate::default());
        };

        let pad = |s: &str| {
            if inner.faults.pad_fields {
                format!("  {s}\t ")
            } else {
                s.to_owned()
            }
        };
        Ok(RawCertificate {
            recipient: pad(&record.recipient),
            issuer: pad(&record.issuer),
            issued_at: pad(&record.issued_at),
            valid: record.valid,
        })
    }

    async fn send_submission(&self, signed: &SignedSubmission) -> BackendResult<TransactionRef> {
        self.check_reachable()?;
        signed
            .verify()
            .map_err(|e| BackendError::Unauthorized(e.to_string()))?;

        let mut inner = self.write();
        if signed.signer != inner.owner {
            return Err(BackendError::Unauthorized(format!(
                "{} is not the ledger owner",
                signed.signer
            )));
        }

        let tx = signed.transaction_ref();
        let known = inner.pending.contains_key(&tx)
            || inner.confirmed.contains_key(&tx)
            || inner.failed.contains_key(&tx);
        if known {
            return Ok(tx);
        }

        let cid = signed.submission.cid;
        if inner.records.contains_key(&cid) {
            return Err(BackendError::AlreadyExists(cid));
        }

        let stale: Vec<TransactionRef> = inner
            .pending
            .iter()
            .filter(|(_, p)| p.submission.cid == cid)
            .map(|(old, _)| *old)
            .collect();
        for old in stale {
            inner.pending.remove(&old);
            inner.failed.insert(old, SUPERSEDED.to_owned());
        }

        inner.pending.insert(tx, signed.clone());
        inner.submissions += 1;
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: &TransactionRef) -> BackendResult<Confirmation> {
        let delay = self.read().faults.confirmation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;

        let mut inner = self.write();
        if let Some(block) = inner.confirmed.get(tx) {
            return Ok(Confirmation::Confirmed { block: *block });
        }
        if let Some(reason) = inner.failed.get(tx) {
            return Ok(Confirmation::Failed {
                reason: reason.clone(),
            });
        }

        let signed = inner
            .pending
            .remove(tx)
            .ok_or_else(|| BackendError::BadData(format!("unknown transaction {tx}")))?;

        let failure = if inner.faults.fail_confirmations {
            Some("transaction reverted during execution")
        } else if inner.records.contains_key(&signed.submission.cid) {
            Some("certificate already exists")
        } else {
            None
        };
        if let Some(reason) = failure {
            inner.failed.insert(*tx, reason.to_owned());
            return Ok(Confirmation::Failed {
                reason: reason.to_owned(),
            });
        }

        inner.height += 1;
        let block = inner.height;
        let record = signed.submission.into_record();
        inner.records.insert(record.cid, record);
        inner.confirmed.insert(*tx, block);
        Ok(Confirmation::Confirmed { block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certledger_core::{Keypair, Submission};
    use chrono::Utc;

    fn setup() -> (MemoryLedger, Keypair) {
        let kp = Keypair::from_seed(&[0x01; 32]);
        (MemoryLedger::new(kp.public_key()), kp)
    }

    fn signed(kp: &Keypair, content: &[u8]) -> SignedSubmission {
        Submission::new(ContentId::of_bytes(content), "Ada", "Uni", Utc::now()).sign(kp)
    }

    #[tokio::test]
    async fn test_submit_and_confirm() {
        let (ledger, kp) = setup();
        let sub = signed(&kp, b"doc");
        let tx = ledger.send_submission(&sub).await.unwrap();
        assert_eq!(ledger.record_count(), 0);

        let c = ledger.await_confirmation(&tx).await.unwrap();
        assert_eq!(c, Confirmation::Confirmed { block: 1 });
        assert_eq!(ledger.record_count(), 1);
        assert!(ledger.certificate_exists(&sub.submission.cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let (ledger, _) = setup();
        ledger.set_reachable(false);
        assert!(matches!(
            ledger.handshake().await,
            Err(BackendError::Unreachable(_))
        ));
        ledger.set_reachable(true);
        assert!(ledger.handshake().await.is_ok());
    }

    #[tokio::test]
    async fn test_placeholder_for_unset_slot() {
        let (ledger, _) = setup();
        let raw = ledger
            .read_certificate(&ContentId::of_bytes(b"nope"))
            .await
            .unwrap();
        assert!(raw.recipient.is_empty());
        assert!(!raw.valid);
    }

    #[tokio::test]
    async fn test_padding_fault() {
        let (ledger, kp) = setup();
        let sub = signed(&kp, b"doc");
        let tx = ledger.send_submission(&sub).await.unwrap();
        ledger.await_confirmation(&tx).await.unwrap();

        ledger.update_faults(|f| f.pad_fields = true);
        let raw = ledger.read_certificate(&sub.submission.cid).await.unwrap();
        assert_ne!(raw.recipient, "Ada");
        assert_eq!(raw.recipient.trim(), "Ada");
    }

    #[tokio::test]
    async fn test_failed_confirmation_leaves_no_record() {
        let (ledger, kp) = setup();
        ledger.update_faults(|f| f.fail_confirmations = true);
        let tx = ledger.send_submission(&signed(&kp, b"doc")).await.unwrap();
        assert!(matches!(
            ledger.await_confirmation(&tx).await.unwrap(),
            Confirmation::Failed { .. }
        ));
        assert_eq!(ledger.record_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_reverts() {
        let (ledger, kp) = setup();
        let tx = ledger.send_submission(&signed(&kp, b"doc")).await.unwrap();
        ledger.await_confirmation(&tx).await.unwrap();

        let again = Submission::new(ContentId::of_bytes(b"doc"), "Eve", "Uni", Utc::now()).sign(&kp);
        assert!(matches!(
            ledger.send_submission(&again).await,
            Err(BackendError::AlreadyExists(_))
        ));
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_newer_submission_supersedes_pending() {
        let (ledger, kp) = setup();
        let cid = ContentId::of_bytes(b"doc");
        let orphan = Submission::new(cid, "Ada", "Uni", Utc::now()).sign(&kp);
        let orphan_tx = ledger.send_submission(&orphan).await.unwrap();

        let retry = Submission::new(cid, "Ada Lovelace", "Uni", Utc::now()).sign(&kp);
        let retry_tx = ledger.send_submission(&retry).await.unwrap();
        assert_eq!(ledger.pending_count(), 1);

        assert_eq!(
            ledger.await_confirmation(&orphan_tx).await.unwrap(),
            Confirmation::Failed {
                reason: SUPERSEDED.to_owned()
            }
        );
        assert_eq!(
            ledger.await_confirmation(&retry_tx).await.unwrap(),
            Confirmation::Confirmed { block: 1 }
        );
        assert_eq!(ledger.record(&cid).unwrap().recipient, "Ada Lovelace");

        // A superseded transaction stays failed when resent.
        assert_eq!(ledger.send_submission(&orphan).await.unwrap(), orphan_tx);
        assert_eq!(ledger.pending_count(), 0);
        assert_eq!(ledger.submission_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (ledger, kp) = setup();
        let sub = signed(&kp, b"doc");
        let tx = ledger.send_submission(&sub).await.unwrap();
        ledger.await_confirmation(&tx).await.unwrap();

        assert!(ledger.invalidate(&sub.submission.cid));
        assert!(!ledger.read_certificate(&sub.submission.cid).await.unwrap().valid);
        assert!(!ledger.invalidate(&ContentId::of_bytes(b"other")));
    }
}
