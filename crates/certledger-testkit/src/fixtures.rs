//! Test fixtures and helpers.
//!
//! [`TestHarness`] wires a [`CertService`] to an in-memory ledger and a
//! temporary evidence directory.

use std::sync::Arc;

use tempfile::TempDir;

use certledger::{Caller, CertService, ServiceConfig, StaticTokens, Upload};
use certledger_core::Keypair;
use certledger_ledger::MemoryLedger;

/// Bearer token the harness accepts as an issuer.
pub const ISSUER_TOKEN: &str = "issuer-token";

/// Bearer token the harness accepts as a non-issuer.
pub const VIEWER_TOKEN: &str = "viewer-token";

/// Deterministic ledger credential seed.
pub const LEDGER_SEED: [u8; 32] = [0x42; 32];

/// A running service over a [`MemoryLedger`].
pub struct TestHarness {
    pub ledger: Arc<MemoryLedger>,
    pub service: CertService<Arc<MemoryLedger>>,
    /// Keeps the evidence directory alive.
    pub dir: TempDir,
}

impl TestHarness {
    /// Start a connected service with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Start a connected service, adjusting the configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ServiceConfig {
            base_url: "https://certs.example.org".to_owned(),
            evidence_root: dir.path().join("evidence"),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let credential = Keypair::from_seed(&LEDGER_SEED);
        let ledger = Arc::new(MemoryLedger::new(credential.public_key()));
        let tokens = StaticTokens::new()
            .with_issuer(ISSUER_TOKEN, "registrar")
            .with_viewer(VIEWER_TOKEN, "auditor");

        let service = CertService::start(Arc::clone(&ledger), credential, Arc::new(tokens), config)
            .await
            .expect("service starts");

        Self {
            ledger,
            service,
            dir,
        }
    }

    /// An authenticated issuer.
    pub fn issuer(&self) -> Caller {
        Caller::issuer("registrar")
    }

    /// `Authorization` header value for the issuer token.
    pub fn issuer_header(&self) -> String {
        format!("Bearer {ISSUER_TOKEN}")
    }

    /// In-memory upload named `name`.
    pub fn upload(&self, bytes: &[u8], name: &str) -> Upload {
        Upload::from_bytes(bytes.to_vec(), Some(name))
    }

    /// Files currently in an evidence namespace directory.
    pub fn evidence_files(&self, namespace: &str) -> Vec<String> {
        let dir = self.service.evidence().root().join(namespace);
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// A sample certificate document.
pub fn sample_pdf(tag: &str) -> Vec<u8> {
    format!("%PDF-1.7\n% certificate for {tag}\n%%EOF\n").into_bytes()
}
