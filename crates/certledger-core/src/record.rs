//! Ledger-resident records and the submissions that create them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_submission, decode_submission, signing_message, TX_DOMAIN};
use crate::cid::ContentId;
use crate::crypto::{Keypair, PublicKey, Signature};
use crate::error::Result;
use crate::types::TransactionRef;

/// Trim surrounding whitespace from a free-text field.
///
/// Applied on the way into the ledger and again on the way out, since ledger
/// implementations have been seen to pad string slots.
pub fn normalize_field(value: &str) -> String {
    value.trim().to_owned()
}

/// Render a timestamp the way records carry it: RFC 3339, millisecond
/// precision, `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A certificate record as held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub cid: ContentId,
    pub recipient: String,
    pub issuer: String,
    pub issued_at: String,
    pub valid: bool,
}

impl CertificateRecord {
    /// Build a normalized record from raw ledger fields.
    pub fn from_raw(cid: ContentId, recipient: &str, issuer: &str, issued_at: &str, valid: bool) -> Self {
        Self {
            cid,
            recipient: normalize_field(recipient),
            issuer: normalize_field(issuer),
            issued_at: normalize_field(issued_at),
            valid,
        }
    }

    /// Whether this record carries the same terms as `submission`.
    pub fn matches(&self, submission: &Submission) -> bool {
        self.cid == submission.cid
            && self.recipient == submission.recipient
            && self.issuer == submission.issuer
    }
}

/// The terms of a ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub cid: ContentId,
    pub recipient: String,
    pub issuer: String,
    pub issued_at: String,
}

impl Submission {
    /// Create a submission with normalized fields.
    pub fn new(cid: ContentId, recipient: &str, issuer: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            cid,
            recipient: normalize_field(recipient),
            issuer: normalize_field(issuer),
            issued_at: format_timestamp(issued_at),
        }
    }

    /// Canonical CBOR bytes.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_submission(self)
    }

    /// Sign with the ledger credential.
    pub fn sign(self, keypair: &Keypair) -> SignedSubmission {
        let canonical = self.canonical_bytes();
        let signature = keypair.sign(&signing_message(&canonical));
        SignedSubmission {
            submission: self,
            canonical,
            signer: keypair.public_key(),
            signature,
        }
    }

    /// The record this submission creates once confirmed.
    pub fn into_record(self) -> CertificateRecord {
        CertificateRecord {
            cid: self.cid,
            recipient: self.recipient,
            issuer: self.issuer,
            issued_at: self.issued_at,
            valid: true,
        }
    }
}

/// A submission together with its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSubmission {
    pub submission: Submission,
    pub canonical: Vec<u8>,
    pub signer: PublicKey,
    pub signature: Signature,
}

impl SignedSubmission {
    /// Reassemble from stored parts, decoding the canonical bytes.
    pub fn from_parts(canonical: Vec<u8>, signer: PublicKey, signature: Signature) -> Result<Self> {
        let submission = decode_submission(&canonical)?;
        Ok(Self {
            submission,
            canonical,
            signer,
            signature,
        })
    }

    /// Check the signature against the claimed signer.
    pub fn verify(&self) -> Result<()> {
        self.signer
            .verify(&signing_message(&self.canonical), &self.signature)
    }

    /// Reference of the transaction carrying this submission.
    pub fn transaction_ref(&self) -> TransactionRef {
        let mut hasher = blake3::Hasher::new();
        hasher.update(TX_DOMAIN);
        hasher.update(&self.canonical);
        hasher.update(&self.signature.0);
        TransactionRef(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_submission_normalizes() {
        let sub = Submission::new(ContentId::of_bytes(b"x"), "  Ada ", "\tUni\n", at());
        assert_eq!(sub.recipient, "Ada");
        assert_eq!(sub.issuer, "Uni");
        assert_eq!(sub.issued_at, "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::from_seed(&[0x11; 32]);
        let signed = Submission::new(ContentId::of_bytes(b"x"), "Ada", "Uni", at()).sign(&kp);
        signed.verify().unwrap();
        assert_eq!(signed.signer, kp.public_key());
    }

    #[test]
    fn test_tampered_submission_fails_verification() {
        let kp = Keypair::from_seed(&[0x11; 32]);
        let mut signed = Submission::new(ContentId::of_bytes(b"x"), "Ada", "Uni", at()).sign(&kp);
        signed.canonical = Submission::new(ContentId::of_bytes(b"x"), "Eve", "Uni", at()).canonical_bytes();
        assert!(signed.verify().is_err());
    }

    #[test]
    fn test_transaction_ref_deterministic() {
        let kp = Keypair::from_seed(&[0x11; 32]);
        let a = Submission::new(ContentId::of_bytes(b"x"), "Ada", "Uni", at()).sign(&kp);
        let b = Submission::new(ContentId::of_bytes(b"x"), "Ada", "Uni", at()).sign(&kp);
        assert_eq!(a.transaction_ref(), b.transaction_ref());

        let c = Submission::new(ContentId::of_bytes(b"y"), "Ada", "Uni", at()).sign(&kp);
        assert_ne!(a.transaction_ref(), c.transaction_ref());
    }

    #[test]
    fn test_from_parts_roundtrip() {
        let kp = Keypair::from_seed(&[0x11; 32]);
        let signed = Submission::new(ContentId::of_bytes(b"x"), "Ada", "Uni", at()).sign(&kp);
        let restored =
            SignedSubmission::from_parts(signed.canonical.clone(), signed.signer, signed.signature)
                .unwrap();
        assert_eq!(restored, signed);
    }

    #[test]
    fn test_record_from_raw_trims() {
        let rec = CertificateRecord::from_raw(ContentId::of_bytes(b"x"), " Ada  ", "Uni ", " t ", true);
        assert_eq!(rec.recipient, "Ada");
        assert_eq!(rec.issuer, "Uni");
        assert_eq!(rec.issued_at, "t");
    }
}
