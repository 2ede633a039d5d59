//! The service facade: one ledger session, one evidence store, both
//! workflows.

use std::sync::Arc;

use tracing::info;

use certledger_core::{Keypair, Receipt, VerificationVerdict};
use certledger_evidence::EvidenceStore;
use certledger_ledger::{LedgerBackend, LedgerClient, LedgerError, LedgerInfo};

use crate::capability::{Authenticator, Caller};
use crate::config::ServiceConfig;
use crate::error::{IssueError, ServiceError, Step, VerifyError};
use crate::issuance::IssuanceCoordinator;
use crate::link::{PayloadRenderer, QrPngRenderer};
use crate::locks::CidLocks;
use crate::upload::Upload;
use crate::verification::VerificationCoordinator;

/// Certificate service.
///
/// Each workflow runs on its own task, so a caller that goes away mid-way
/// does not leave a half-finished issuance behind.
pub struct CertService<B> {
    ledger: Arc<LedgerClient<B>>,
    evidence: Arc<EvidenceStore>,
    locks: Arc<CidLocks>,
    issuance: Arc<IssuanceCoordinator<B>>,
    verification: Arc<VerificationCoordinator<B>>,
    authenticator: Arc<dyn Authenticator>,
    config: ServiceConfig,
}

impl<B: LedgerBackend + 'static> CertService<B> {
    /// Build the service without contacting the ledger.
    pub async fn new(
        backend: B,
        credential: Keypair,
        authenticator: Arc<dyn Authenticator>,
        config: ServiceConfig,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let evidence = Arc::new(EvidenceStore::open(&config.evidence_root).await?);
        let ledger = Arc::new(LedgerClient::new(backend, credential, config.ledger.clone()));
        let locks = Arc::new(CidLocks::new());
        let renderer: Arc<dyn PayloadRenderer> = Arc::new(QrPngRenderer::default());

        let issuance = Arc::new(IssuanceCoordinator::new(
            Arc::clone(&ledger),
            Arc::clone(&evidence),
            Arc::clone(&locks),
            renderer,
            &config,
        ));
        let verification = Arc::new(VerificationCoordinator::new(
            Arc::clone(&ledger),
            Arc::clone(&evidence),
            &config,
        ));

        Ok(Self {
            ledger,
            evidence,
            locks,
            issuance,
            verification,
            authenticator,
            config,
        })
    }

    /// Build the service and establish the ledger session.
    pub async fn start(
        backend: B,
        credential: Keypair,
        authenticator: Arc<dyn Authenticator>,
        config: ServiceConfig,
    ) -> Result<Self, ServiceError> {
        let service = Self::new(backend, credential, authenticator, config).await?;
        let info = service.connect().await?;
        info!(
            network = %info.network,
            evidence = %service.evidence.root().display(),
            base_url = %service.config.base_url,
            "certificate service started"
        );
        Ok(service)
    }

    /// Swap the scannable payload renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn PayloadRenderer>) -> Self {
        self.issuance = Arc::new(IssuanceCoordinator::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.evidence),
            Arc::clone(&self.locks),
            renderer,
            &self.config,
        ));
        self
    }

    /// (Re-)establish the ledger session.
    pub async fn connect(&self) -> Result<LedgerInfo, LedgerError> {
        self.ledger.connect().await
    }

    pub fn ledger(&self) -> &Arc<LedgerClient<B>> {
        &self.ledger
    }

    pub fn evidence(&self) -> &EvidenceStore {
        &self.evidence
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Resolve an `Authorization` header.
    pub fn authenticate(&self, authorization: Option<&str>) -> Caller {
        self.authenticator.authenticate(authorization)
    }

    /// Issue a certificate.
    pub async fn issue(
        &self,
        caller: Caller,
        upload: Upload,
        recipient: String,
        issuer: String,
    ) -> Result<Receipt, IssueError> {
        let issuance = Arc::clone(&self.issuance);
        tokio::spawn(async move { issuance.issue(&caller, &upload, &recipient, &issuer).await })
            .await
            .map_err(|e| IssueError::internal(Step::Task, e))?
    }

    /// Verify a document.
    pub async fn verify(&self, upload: Upload) -> Result<VerificationVerdict, VerifyError> {
        let verification = Arc::clone(&self.verification);
        tokio::spawn(async move { verification.verify(&upload).await })
            .await
            .map_err(|e| VerifyError::Internal {
                step: Step::Task,
                message: e.to_string(),
            })?
    }
}
