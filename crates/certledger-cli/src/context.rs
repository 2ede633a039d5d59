//! Global options shared by subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use certledger::{CertService, ServiceConfig, StaticTokens};
use certledger_core::Keypair;
use certledger_ledger::SqliteLedger;

pub struct Globals {
    pub ledger: PathBuf,
    pub key: Option<String>,
    pub evidence_dir: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Globals {
    /// The ledger credential. Required for anything that writes.
    pub fn credential(&self) -> Result<Keypair> {
        let seed = self
            .key
            .as_deref()
            .context("no ledger credential; pass --key or set CERTLEDGER_LEDGER_KEY")?;
        Keypair::from_hex_seed(seed.trim()).context("invalid ledger credential")
    }

    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::from_env()?;
        if let Some(dir) = &self.evidence_dir {
            config.evidence_root = dir.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn open_ledger(&self) -> Result<SqliteLedger> {
        SqliteLedger::open(&self.ledger)
            .with_context(|| format!("failed to open ledger {}", self.ledger.display()))
    }

    /// A connected service. The local operator acts as issuer directly, so
    /// no bearer tokens are configured.
    pub async fn service(&self) -> Result<CertService<SqliteLedger>> {
        CertService::start(
            self.open_ledger()?,
            self.credential()?,
            Arc::new(StaticTokens::new()),
            self.config()?,
        )
        .await
        .context("failed to start certificate service")
    }
}
