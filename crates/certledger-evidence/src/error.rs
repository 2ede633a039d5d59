//! Error types for the evidence store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from evidence store operations.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A write-once entry is already present.
    #[error("evidence file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The store root exists but is not a directory.
    #[error("evidence root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Result type for evidence store operations.
pub type Result<T> = std::result::Result<T, EvidenceError>;
