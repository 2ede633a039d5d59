//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

use certledger_ledger::{LedgerClientConfig, ResponsePolicy};

use crate::error::ConfigError;

pub const ENV_BASE_URL: &str = "CERTLEDGER_BASE_URL";
pub const ENV_EVIDENCE_DIR: &str = "CERTLEDGER_EVIDENCE_DIR";
pub const ENV_LEDGER_TIMEOUT_MS: &str = "CERTLEDGER_LEDGER_TIMEOUT_MS";
pub const ENV_CONFIRM_TIMEOUT_MS: &str = "CERTLEDGER_CONFIRM_TIMEOUT_MS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "CERTLEDGER_MAX_UPLOAD_BYTES";
pub const ENV_STRICT_LEDGER: &str = "CERTLEDGER_STRICT_LEDGER";

/// Configuration for [`CertService`](crate::CertService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Prefix of verification links.
    pub base_url: String,
    /// Root of the evidence store.
    pub evidence_root: PathBuf,
    /// Bound on fingerprinting one upload.
    pub fingerprint_timeout: Duration,
    /// Largest upload accepted, in bytes.
    pub max_upload_bytes: Option<u64>,
    pub ledger: LedgerClientConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_owned(),
            evidence_root: PathBuf::from("filebase"),
            fingerprint_timeout: Duration::from_secs(30),
            max_upload_bytes: Some(50 * 1024 * 1024),
            ledger: LedgerClientConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `CERTLEDGER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(dir) = lookup(ENV_EVIDENCE_DIR) {
            config.evidence_root = PathBuf::from(dir);
        }
        if let Some(ms) = lookup(ENV_LEDGER_TIMEOUT_MS) {
            config.ledger.request_timeout = Duration::from_millis(parse_u64(ENV_LEDGER_TIMEOUT_MS, &ms)?);
        }
        if let Some(ms) = lookup(ENV_CONFIRM_TIMEOUT_MS) {
            config.ledger.confirmation_timeout =
                Duration::from_millis(parse_u64(ENV_CONFIRM_TIMEOUT_MS, &ms)?);
        }
        if let Some(bytes) = lookup(ENV_MAX_UPLOAD_BYTES) {
            // 0 lifts the limit.
            config.max_upload_bytes = match parse_u64(ENV_MAX_UPLOAD_BYTES, &bytes)? {
                0 => None,
                n => Some(n),
            };
        }
        if let Some(flag) = lookup(ENV_STRICT_LEDGER) {
            config.ledger.policy = if parse_bool(ENV_STRICT_LEDGER, &flag)? {
                ResponsePolicy::Strict
            } else {
                ResponsePolicy::Lenient
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: ENV_BASE_URL,
                value: self.base_url.clone(),
                reason: "must start with http:// or https://".into(),
            });
        }
        if self.ledger.request_timeout.is_zero() || self.ledger.confirmation_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: ENV_LEDGER_TIMEOUT_MS,
                value: "0".into(),
                reason: "ledger timeouts must be positive".into(),
            });
        }
        Ok(())
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var,
        value: value.to_owned(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_owned(),
            reason: "expected a boolean".into(),
        }),
    }
}
