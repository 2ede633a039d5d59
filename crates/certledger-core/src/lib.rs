//! # certledger core
//!
//! Pure primitives for certificate issuance and verification: content
//! identifiers, streaming fingerprinting, ledger records and the canonical
//! encoding of ledger submissions.
//!
//! This crate does no storage and no networking. Its only I/O is reading the
//! document stream handed to the [`Fingerprinter`].
//!
//! ## Key Types
//!
//! - [`ContentId`] - Versioned sha2-256 content identifier (CIDv1, raw or dag-pb)
//! - [`Fingerprinter`] - Bounded-memory CID computation over byte streams
//! - [`CertificateRecord`] - The ledger-resident record for one CID
//! - [`Submission`] / [`SignedSubmission`] - Terms of a ledger write
//! - [`Receipt`] / [`VerificationVerdict`] - Workflow outputs
//!
//! ## Canonicalization
//!
//! Submissions are signed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod cid;
pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod receipt;
pub mod record;
pub mod types;
pub mod unixfs;

pub use canonical::{canonical_submission, decode_submission, signing_message};
pub use cid::{Codec, ContentId};
pub use crypto::{Keypair, PublicKey, Signature};
pub use error::{CoreError, ReadError, Result};
pub use fingerprint::{fingerprint_bytes, Fingerprinter};
pub use receipt::{Receipt, Resolved, VerificationVerdict, UNKNOWN};
pub use record::{format_timestamp, normalize_field, CertificateRecord, SignedSubmission, Submission};
pub use types::TransactionRef;
