//! Checking a document against the ledger.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use certledger_core::{ContentId, Fingerprinter, VerificationVerdict};
use certledger_evidence::{EvidenceStore, Namespace};
use certledger_ledger::{LedgerBackend, LedgerClient, Lookup};

use crate::config::ServiceConfig;
use crate::error::VerifyError;
use crate::upload::Upload;

/// Runs the verification workflow. Public: no capability required.
pub struct VerificationCoordinator<B> {
    ledger: Arc<LedgerClient<B>>,
    evidence: Arc<EvidenceStore>,
    fingerprinter: Fingerprinter,
    fingerprint_timeout: Duration,
}

impl<B: LedgerBackend> VerificationCoordinator<B> {
    pub fn new(
        ledger: Arc<LedgerClient<B>>,
        evidence: Arc<EvidenceStore>,
        config: &ServiceConfig,
    ) -> Self {
        let mut fingerprinter = Fingerprinter::default();
        if let Some(limit) = config.max_upload_bytes {
            fingerprinter = fingerprinter.with_max_len(limit);
        }
        Self {
            ledger,
            evidence,
            fingerprinter,
            fingerprint_timeout: config.fingerprint_timeout,
        }
    }

    /// Verify `upload`.
    ///
    /// Only an unreadable upload is an error. A ledger that cannot be
    /// consulted yields a non-authentic verdict with `ledger_reachable`
    /// unset.
    #[instrument(skip_all, fields(filename = ?upload.filename))]
    pub async fn verify(&self, upload: &Upload) -> Result<VerificationVerdict, VerifyError> {
        let cid = upload
            .fingerprint_within(&self.fingerprinter, self.fingerprint_timeout)
            .await?;
        debug!(%cid, "fingerprinted upload");

        let verdict = match self.ledger.lookup(&cid).await {
            Ok(Lookup::Found(record)) => VerificationVerdict::from_record(&record),
            Ok(Lookup::NotFound) => VerificationVerdict::not_found(cid),
            Err(e) => {
                warn!(%cid, error = %e, "ledger lookup failed");
                VerificationVerdict::unreachable(cid, e.to_string())
            }
        };

        self.keep_submission(upload, &cid).await;

        info!(
            %cid,
            authentic = verdict.is_authentic,
            ledger_reachable = verdict.ledger_reachable,
            "verification completed"
        );
        Ok(verdict)
    }

    /// Best effort: failures are logged and otherwise ignored.
    async fn keep_submission(&self, upload: &Upload, cid: &ContentId) {
        let staged = match upload.stage(&self.evidence).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(%cid, error = %e, "failed to stage verify submission");
                return;
            }
        };
        match self
            .evidence
            .publish(staged, Namespace::VerifySubmissions, cid, &upload.extension())
            .await
        {
            Ok(path) => debug!(path = %path.display(), "verify submission stored"),
            Err(e) => warn!(%cid, error = %e, "failed to store verify submission"),
        }
    }
}
