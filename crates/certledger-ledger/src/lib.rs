//! # certledger ledger
//!
//! Access to the authoritative certificate ledger.
//!
//! ## Overview
//!
//! The ledger is reached through the narrow [`LedgerBackend`] contract:
//! a handshake, an existence check, a slot read, and a write split into
//! submit and confirm. [`LedgerClient`] wraps a backend with a session,
//! per-call timeouts, and the error taxonomy the coordinators rely on.
//!
//! ## Key Types
//!
//! - [`LedgerBackend`] - The async trait every ledger implements
//! - [`LedgerClient`] - Session, timeouts, lenient decoding
//! - [`MemoryLedger`] - In-memory ledger with fault injection, for tests
//! - [`SqliteLedger`] - Single-node development ledger on SQLite
//! - [`Lookup`] - Found record or `NotFound`
//! - [`LedgerError`] - What callers see when the ledger misbehaves
//!
//! ## Usage
//!
//! ```rust,no_run
//! use certledger_core::{ContentId, Keypair};
//! use certledger_ledger::{LedgerClient, LedgerClientConfig, SqliteLedger};
//!
//! async fn example() {
//!     let key = Keypair::generate();
//!     let ledger = SqliteLedger::open("ledger.db").unwrap();
//!     ledger.initialize(key.public_key(), "dev").unwrap();
//!
//!     let client = LedgerClient::new(ledger, key, LedgerClientConfig::default());
//!     client.connect().await.unwrap();
//!
//!     let cid = ContentId::of_bytes(b"%PDF-1.7 ...");
//!     let tx = client.submit(cid, "Ada Lovelace", "Analytical University", chrono::Utc::now()).await.unwrap();
//!     println!("recorded in {tx}");
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Uniqueness**: the ledger refuses a second record for a CID; the
//!   client reports it as [`LedgerError::AlreadyRecorded`]
//! - **Defensive reads**: empty slots are `NotFound`; undecodable reads are
//!   `NotFound` under [`ResponsePolicy::Lenient`] and errors under `Strict`
//! - **Unavailability is never "not found"**: no session, unreachable
//!   ledger and timeouts all surface as retryable errors

pub mod backend;
pub mod client;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;

pub use backend::{
    BackendResult, Confirmation, LedgerBackend, LedgerInfo, RawCertificate, SUPERSEDED,
};
pub use client::{LedgerClient, LedgerClientConfig, Lookup, ResponsePolicy};
pub use error::{BackendError, LedgerError, Result};
pub use memory::{Faults, MemoryLedger};
pub use sqlite::{SqliteLedger, DEFAULT_NETWORK};
