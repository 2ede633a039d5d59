//! Subcommand implementations.

pub mod fingerprint;
pub mod init_ledger;
pub mod issue;
pub mod keygen;
pub mod lookup;
pub mod verify;
