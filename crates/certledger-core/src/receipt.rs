//! Workflow outputs: the issuance receipt and the verification verdict.
//!
//! Neither is persisted. The receipt is handed to the issuer, who is
//! responsible for keeping it; the verdict is derived afresh on every
//! verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::cid::ContentId;
use crate::record::{format_timestamp, CertificateRecord};
use crate::types::TransactionRef;

/// Sentinel rendered for fields a verification could not resolve.
pub const UNKNOWN: &str = "Unknown";

/// Output of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub cid: ContentId,
    pub recipient: String,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    /// `<base-url>/verify?fileH=<cid>`.
    pub verification_link: String,
    /// Scannable rendering of `verification_link`.
    pub qr_image: String,
    pub transaction: TransactionRef,
}

impl Receipt {
    /// `issued_at` in record form.
    pub fn issued_on(&self) -> String {
        format_timestamp(self.issued_at)
    }
}

/// A field that may or may not have been resolved from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Resolved {
    Known(String),
    #[default]
    Unknown,
}

impl Resolved {
    /// Known if non-empty after trimming.
    pub fn from_ledger(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::Unknown
        } else {
            Self::Known(trimmed.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(v) => v,
            Self::Unknown => UNKNOWN,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl From<String> for Resolved {
    fn from(value: String) -> Self {
        if value == UNKNOWN {
            Self::Unknown
        } else {
            Self::from_ledger(&value)
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of checking a document against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub is_authentic: bool,
    pub cid: ContentId,
    pub recipient: Resolved,
    pub issuer: Resolved,
    pub issued_at: Resolved,
    /// Whether the ledger answered at all.
    pub ledger_reachable: bool,
    /// Why the ledger could not be consulted, when it could not.
    pub error_message: Option<String>,
}

impl VerificationVerdict {
    /// Verdict for a record the ledger returned.
    pub fn from_record(record: &CertificateRecord) -> Self {
        Self {
            is_authentic: record.valid,
            cid: record.cid,
            recipient: Resolved::from_ledger(&record.recipient),
            issuer: Resolved::from_ledger(&record.issuer),
            issued_at: Resolved::from_ledger(&record.issued_at),
            ledger_reachable: true,
            error_message: None,
        }
    }

    /// Verdict when the ledger has no record for `cid`.
    pub fn not_found(cid: ContentId) -> Self {
        Self {
            is_authentic: false,
            cid,
            recipient: Resolved::Unknown,
            issuer: Resolved::Unknown,
            issued_at: Resolved::Unknown,
            ledger_reachable: true,
            error_message: None,
        }
    }

    /// Verdict when the ledger could not be consulted.
    pub fn unreachable(cid: ContentId, reason: impl Into<String>) -> Self {
        Self {
            ledger_reachable: false,
            error_message: Some(reason.into()),
            ..Self::not_found(cid)
        }
    }
}
