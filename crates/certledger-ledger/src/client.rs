//! Session-holding client over a [`LedgerBackend`].
//!
//! The client owns the ledger credential and the session learned at
//! handshake. Every backend call is bounded by a timeout. An empty
//! certificate slot means "no record", and so does an undecodable one unless
//! the policy is [`ResponsePolicy::Strict`].

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use certledger_core::{CertificateRecord, ContentId, Keypair, PublicKey, Submission, TransactionRef};

use crate::backend::{BackendResult, Confirmation, LedgerBackend, LedgerInfo};
use crate::error::{BackendError, LedgerError, Result};

/// How to treat reads the ledger could not answer cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponsePolicy {
    /// Undecodable or reverted reads mean "no record".
    #[default]
    Lenient,
    /// Undecodable or reverted reads are errors.
    Strict,
}

/// Client tuning.
#[derive(Debug, Clone)]
pub struct LedgerClientConfig {
    /// Bound on each handshake, read and submit call.
    pub request_timeout: Duration,
    /// Bound on waiting for a submission to finalize.
    pub confirmation_timeout: Duration,
    pub policy: ResponsePolicy,
}

impl Default for LedgerClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(60),
            policy: ResponsePolicy::Lenient,
        }
    }
}

/// Outcome of an authoritative read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(CertificateRecord),
    NotFound,
}

impl Lookup {
    pub fn into_record(self) -> Option<CertificateRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    info: LedgerInfo,
    connected_at: DateTime<Utc>,
}

/// Ledger client.
///
/// Built once per process and shared behind an `Arc`. The session is
/// read-mostly: established by [`connect`](Self::connect), dropped by
/// [`disconnect`](Self::disconnect).
pub struct LedgerClient<B> {
    backend: B,
    credential: Keypair,
    config: LedgerClientConfig,
    session: RwLock<Option<Session>>,
}

impl<B: LedgerBackend> LedgerClient<B> {
    /// Create a client. No session exists until [`connect`](Self::connect).
    pub fn new(backend: B, credential: Keypair, config: LedgerClientConfig) -> Self {
        Self {
            backend,
            credential,
            config,
            session: RwLock::new(None),
        }
    }

    /// Handshake with the ledger and establish the session.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<LedgerInfo> {
        let info = self
            .bounded("handshake", self.config.request_timeout, self.backend.handshake())
            .await??;

        let signer = self.credential.public_key();
        if info.owner == signer {
            info!(network = %info.network, %signer, "connected to ledger as owner");
        } else {
            warn!(
                network = %info.network,
                %signer,
                owner = %info.owner,
                "ledger credential is not the ledger owner; submissions will be rejected"
            );
        }

        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(Session {
            info: info.clone(),
            connected_at: Utc::now(),
        });
        Ok(info)
    }

    /// Whether a session is established.
    pub fn is_connected(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the session. Subsequent calls fail with `Unavailable`.
    pub fn disconnect(&self) {
        if let Some(session) = self.session.write().unwrap_or_else(PoisonError::into_inner).take() {
            info!(
                network = %session.info.network,
                since = %session.connected_at,
                "disconnected from ledger"
            );
        }
    }

    /// Ledger identity learned at connect.
    pub fn info(&self) -> Option<LedgerInfo> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.info.clone())
    }

    /// Whether our credential owns the connected ledger.
    pub fn is_owner(&self) -> bool {
        self.info()
            .is_some_and(|info| info.owner == self.credential.public_key())
    }

    /// Public half of the ledger credential.
    pub fn signer(&self) -> PublicKey {
        self.credential.public_key()
    }

    pub fn config(&self) -> &LedgerClientConfig {
        &self.config
    }

    /// Best-effort existence check.
    ///
    /// Callers must be prepared for `Unsupported` and fall back to
    /// [`lookup`](Self::lookup).
    pub async fn exists(&self, cid: &ContentId) -> Result<bool> {
        self.ensure_session()?;
        Ok(self
            .bounded(
                "certificate_exists",
                self.config.request_timeout,
                self.backend.certificate_exists(cid),
            )
            .await??)
    }

    /// Authoritative read of the record for `cid`.
    #[instrument(skip(self, cid), fields(%cid))]
    pub async fn lookup(&self, cid: &ContentId) -> Result<Lookup> {
        self.ensure_session()?;

        match self.exists(cid).await {
            Ok(false) => {
                debug!("fast path: no record");
                return Ok(Lookup::NotFound);
            }
            Ok(true) => {}
            Err(e) => debug!(error = %e, "fast path unavailable, reading slot directly"),
        }

        let raw = match self
            .bounded(
                "read_certificate",
                self.config.request_timeout,
                self.backend.read_certificate(cid),
            )
            .await?
        {
            Ok(raw) => raw,
            Err(BackendError::Reverted(msg) | BackendError::BadData(msg)) => {
                return match self.config.policy {
                    ResponsePolicy::Lenient => {
                        warn!(reason = %msg, "undecodable ledger read treated as no record");
                        Ok(Lookup::NotFound)
                    }
                    ResponsePolicy::Strict => Err(LedgerError::MalformedResponse(msg)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        // Unset slots come back zeroed; an empty recipient is not a record.
        if raw.recipient.trim().is_empty() {
            debug!("empty certificate slot");
            return Ok(Lookup::NotFound);
        }

        Ok(Lookup::Found(CertificateRecord::from_raw(
            *cid,
            &raw.recipient,
            &raw.issuer,
            &raw.issued_at,
            raw.valid,
        )))
    }

    /// Sign, submit and wait for confirmation of a new record.
    ///
    /// Returns only once the record is final.
    #[instrument(skip(self, cid), fields(%cid))]
    pub async fn submit(
        &self,
        cid: ContentId,
        recipient: &str,
        issuer: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<TransactionRef> {
        self.ensure_session()?;

        let signed = Submission::new(cid, recipient, issuer, issued_at).sign(&self.credential);
        let tx = self
            .bounded(
                "send_submission",
                self.config.request_timeout,
                self.backend.send_submission(&signed),
            )
            .await?
            .map_err(|e| match e {
                BackendError::Reverted(msg) => LedgerError::SubmissionFailed(msg),
                other => other.into(),
            })?;

        debug!(%tx, "submission accepted, awaiting confirmation");

        let confirmation = self
            .bounded(
                "await_confirmation",
                self.config.confirmation_timeout,
                self.backend.await_confirmation(&tx),
            )
            .await??;

        match confirmation {
            Confirmation::Confirmed { block } => {
                info!(%tx, block, "certificate recorded on ledger");
                Ok(tx)
            }
            Confirmation::Failed { reason } => {
                warn!(%tx, %reason, "submission did not finalize");
                Err(LedgerError::SubmissionFailed(reason))
            }
        }
    }

    fn ensure_session(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("not connected to ledger".into()))
        }
    }

    /// Run a backend call under a time budget. The outer error is the
    /// timeout, the inner one is whatever the backend reported.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        limit: Duration,
        call: impl Future<Output = BackendResult<T>>,
    ) -> Result<BackendResult<T>> {
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| LedgerError::Timeout {
                operation,
                after: limit,
            })
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use crate::memory::MemoryLedger;
    use certledger_core::format_timestamp;
    use proptest::prelude::*;

    fn padding() -> impl Strategy<Value = String> {
        "[ \t\n]{0,3}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Whatever was submitted reads back trimmed, however the backend
        /// pads its slots.
        #[test]
        fn lookup_returns_submitted_terms(
            content in prop::collection::vec(any::<u8>(), 0..256),
            recipient in "[A-Za-z][A-Za-z .'-]{0,30}[A-Za-z]",
            issuer in "[A-Za-z][A-Za-z .'-]{0,30}[A-Za-z]",
            pre in padding(),
            post in padding(),
            pad_reads in any::<bool>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let owner = Keypair::from_seed(&[0x33; 32]);
                let ledger = std::sync::Arc::new(MemoryLedger::new(owner.public_key()));
                let client = LedgerClient::new(
                    std::sync::Arc::clone(&ledger),
                    owner,
                    LedgerClientConfig::default(),
                );
                client.connect().await.unwrap();

                let cid = ContentId::of_bytes(&content);
                let at = Utc::now();
                client
                    .submit(cid, &format!("{pre}{recipient}{post}"), &format!("{post}{issuer}{pre}"), at)
                    .await
                    .unwrap();
                ledger.update_faults(|f| f.pad_fields = pad_reads);

                let record = client.lookup(&cid).await.unwrap().into_record().unwrap();
                prop_assert_eq!(record.cid, cid);
                prop_assert_eq!(&record.recipient, &recipient);
                prop_assert_eq!(&record.issuer, &issuer);
                prop_assert_eq!(record.issued_at, format_timestamp(at));
                prop_assert!(record.valid);
                Ok(())
            })?;
        }
    }
}
