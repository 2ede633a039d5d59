//! # certledger
//!
//! Issue certificates by binding documents to ledger records, and verify
//! documents against those records.
//!
//! ## Overview
//!
//! A document's identity is its content identifier (CID), derived from its
//! bytes alone. Issuance writes `{cid, recipient, issuer, issued_at}` to an
//! authoritative ledger, at most once per CID. Verification fingerprints a
//! submitted document and asks the ledger whether a valid record exists.
//! A local evidence store keeps copies of what went through both
//! workflows; it is never consulted for trust decisions.
//!
//! ## Key Types
//!
//! - [`CertService`] - Facade owning the ledger session and evidence store
//! - [`IssuanceCoordinator`] / [`VerificationCoordinator`] - The two workflows
//! - [`Caller`] / [`IssuerCapability`] - Who may issue
//! - [`ServiceConfig`] - Base URL, evidence root, timeouts
//! - [`api`] - Transport-agnostic endpoint handlers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use certledger::{CertService, Caller, ServiceConfig, StaticTokens, Upload};
//! use certledger::core::Keypair;
//! use certledger::ledger::SqliteLedger;
//!
//! async fn example() {
//!     let key = Keypair::generate();
//!     let ledger = SqliteLedger::open("ledger.db").unwrap();
//!     ledger.initialize(key.public_key(), "dev").unwrap();
//!
//!     let tokens = Arc::new(StaticTokens::new().with_issuer("s3cret", "registrar"));
//!     let service = CertService::start(ledger, key, tokens, ServiceConfig::default())
//!         .await
//!         .unwrap();
//!
//!     let upload = Upload::from_path("diploma.pdf", Some("diploma.pdf"));
//!     let receipt = service
//!         .issue(Caller::issuer("registrar"), upload.clone(), "Ada Lovelace".into(), "Analytical University".into())
//!         .await
//!         .unwrap();
//!     println!("verify at {}", receipt.verification_link);
//!
//!     let verdict = service.verify(upload).await.unwrap();
//!     assert!(verdict.is_authentic);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `certledger::core` - CIDs, fingerprinting, records
//! - `certledger::ledger` - Ledger client and backends
//! - `certledger::evidence` - Evidence store

pub mod api;
pub mod capability;
pub mod config;
pub mod error;
pub mod issuance;
pub mod link;
pub mod locks;
pub mod service;
pub mod upload;
pub mod verification;

pub use certledger_core as core;
pub use certledger_evidence as evidence;
pub use certledger_ledger as ledger;

pub use api::{
    issue_endpoint, issue_error, receipt_body, verdict_body, verify_endpoint, ApiResponse, IssueForm,
    VerifyForm,
};
pub use capability::{Authenticator, Caller, IssuerCapability, StaticTokens};
pub use config::ServiceConfig;
pub use error::{ConfigError, IssueError, RenderError, ServiceError, Step, VerifyError};
pub use issuance::IssuanceCoordinator;
pub use link::{PayloadRenderer, QrPngRenderer, VerificationLink};
pub use locks::CidLocks;
pub use service::CertService;
pub use upload::{Upload, UploadSource};
pub use verification::VerificationCoordinator;

pub use certledger_core::{ContentId, Receipt, Resolved, VerificationVerdict};
