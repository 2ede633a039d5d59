//! # certledger testkit
//!
//! Testing utilities for certledger.
//!
//! - **Golden vectors**: documents with their expected CIDs
//! - **Generators**: proptest strategies
//! - **Fixtures**: a service wired to an in-memory ledger
//!
//! ```rust
//! use certledger_testkit::vectors::all_vectors;
//! use certledger_core::ContentId;
//!
//! for v in all_vectors() {
//!     assert_eq!(ContentId::of_bytes(&(v.input)()).to_string(), v.expected_cid);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{sample_pdf, TestHarness, ISSUER_TOKEN, VIEWER_TOKEN};
