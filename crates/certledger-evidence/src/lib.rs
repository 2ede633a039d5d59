//! # certledger evidence
//!
//! Local, content-addressed copies of documents that went through the
//! issuance and verification workflows.
//!
//! Layout under the store root:
//!
//! - `issued/<cid><ext>` - write-once, first publisher wins
//! - `verify-submissions/<cid><ext>` - latest submission replaces the prior one
//! - `.index/<namespace>/<cid>` - the extension each entry is stored under
//! - `.staging/` - uploads not yet published; emptied on open
//!
//! Files are staged first and published by hard link (`issued`) or rename
//! (`verify-submissions`), so a published entry is always complete.

pub mod error;
pub mod namespace;
pub mod staging;
pub mod store;

pub use error::{EvidenceError, Result};
pub use namespace::{file_name, sanitize_extension, Namespace, MAX_EXTENSION_LEN};
pub use staging::StagedFile;
pub use store::{EvidenceStore, INDEX_DIR, STAGING_DIR};
