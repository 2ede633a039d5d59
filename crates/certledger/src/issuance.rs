//! Binding a document to a new ledger record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use certledger_core::{normalize_field, ContentId, Fingerprinter, Receipt};
use certledger_evidence::{EvidenceError, EvidenceStore, Namespace};
use certledger_ledger::{LedgerBackend, LedgerClient, LedgerError, Lookup};

use crate::capability::Caller;
use crate::config::ServiceConfig;
use crate::error::{IssueError, Step};
use crate::link::{PayloadRenderer, VerificationLink};
use crate::locks::CidLocks;
use crate::upload::Upload;

/// Runs the issuance workflow.
///
/// Fingerprint, then duplicate check, then ledger write, then publish. The
/// ledger write is the commit point: nothing is published unless it
/// succeeds, and a failed publish after it does not undo it.
pub struct IssuanceCoordinator<B> {
    ledger: Arc<LedgerClient<B>>,
    evidence: Arc<EvidenceStore>,
    locks: Arc<CidLocks>,
    renderer: Arc<dyn PayloadRenderer>,
    fingerprinter: Fingerprinter,
    fingerprint_timeout: Duration,
    base_url: String,
}

impl<B: LedgerBackend> IssuanceCoordinator<B> {
    pub fn new(
        ledger: Arc<LedgerClient<B>>,
        evidence: Arc<EvidenceStore>,
        locks: Arc<CidLocks>,
        renderer: Arc<dyn PayloadRenderer>,
        config: &ServiceConfig,
    ) -> Self {
        let mut fingerprinter = Fingerprinter::default();
        if let Some(limit) = config.max_upload_bytes {
            fingerprinter = fingerprinter.with_max_len(limit);
        }
        Self {
            ledger,
            evidence,
            locks,
            renderer,
            fingerprinter,
            fingerprint_timeout: config.fingerprint_timeout,
            base_url: config.base_url.trim().to_owned(),
        }
    }

    /// Issue a certificate for `upload`.
    #[instrument(skip_all, fields(filename = ?upload.filename))]
    pub async fn issue(
        &self,
        caller: &Caller,
        upload: &Upload,
        recipient: &str,
        issuer: &str,
    ) -> Result<Receipt, IssueError> {
        let capability = caller.issuer_capability()?;

        let recipient = normalize_field(recipient);
        let issuer = normalize_field(issuer);
        if recipient.is_empty() {
            return Err(IssueError::InvalidRequest("recipient is required".into()));
        }
        if issuer.is_empty() {
            return Err(IssueError::InvalidRequest("issuer is required".into()));
        }

        let cid = upload
            .fingerprint_within(&self.fingerprinter, self.fingerprint_timeout)
            .await?;
        debug!(%cid, "fingerprinted upload");

        let link = VerificationLink::new(&self.base_url, &cid);
        let qr_image = self
            .renderer
            .render(&link)
            .map_err(|e| IssueError::internal(Step::Render, e))?;

        let _guard = self.locks.lock(cid).await;
        self.ensure_new(&cid).await?;

        let staged = upload
            .stage(&self.evidence)
            .await
            .map_err(|e| IssueError::internal(Step::Stage, e))?;

        let issued_at = Utc::now();
        // On failure the staged copy is dropped and removed.
        let transaction = self
            .ledger
            .submit(cid, &recipient, &issuer, issued_at)
            .await
            .map_err(|e| IssueError::from_ledger(Step::LedgerWrite, e))?;

        match self
            .evidence
            .publish(staged, Namespace::Issued, &cid, &upload.extension())
            .await
        {
            Ok(path) => debug!(path = %path.display(), "issued document stored"),
            Err(EvidenceError::AlreadyExists(path)) => warn!(
                %cid,
                path = %path.display(),
                "issued document already on disk; ledger record stands"
            ),
            Err(e) => warn!(%cid, error = %e, "failed to store issued document; ledger record stands"),
        }

        info!(
            %cid,
            %transaction,
            subject = capability.subject(),
            "certificate issued"
        );

        Ok(Receipt {
            cid,
            recipient,
            issuer,
            issued_at,
            verification_link: link.into_string(),
            qr_image,
            transaction,
        })
    }

    /// Fail with `DuplicateContent` if `cid` is already issued.
    async fn ensure_new(&self, cid: &ContentId) -> Result<(), IssueError> {
        if self
            .evidence
            .contains(Namespace::Issued, cid)
            .await
            .map_err(|e| IssueError::internal(Step::DuplicateCheck, e))?
        {
            debug!(%cid, "already in evidence store");
            return Err(IssueError::DuplicateContent(*cid));
        }

        let recorded = match self.ledger.exists(cid).await {
            Ok(recorded) => recorded,
            Err(e) if e.is_retryable() => return Err(IssueError::LedgerUnavailable(e)),
            Err(e) => {
                debug!(%cid, error = %e, "existence check failed, falling back to lookup");
                self.lookup_recorded(cid).await?
            }
        };

        if recorded {
            debug!(%cid, "already on ledger");
            return Err(IssueError::DuplicateContent(*cid));
        }
        Ok(())
    }

    async fn lookup_recorded(&self, cid: &ContentId) -> Result<bool, IssueError> {
        match self.ledger.lookup(cid).await {
            Ok(Lookup::Found(_)) => Ok(true),
            Ok(Lookup::NotFound) => Ok(false),
            Err(e @ LedgerError::MalformedResponse(_)) => {
                Err(IssueError::internal(Step::DuplicateCheck, e))
            }
            Err(e) => Err(IssueError::from_ledger(Step::LedgerRead, e)),
        }
    }
}
