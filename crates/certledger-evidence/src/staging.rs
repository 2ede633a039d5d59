//! Staged uploads: bytes copied into the store but not yet published.

use std::path::{Path, PathBuf};

use tracing::warn;

/// A file under `.staging/` that is removed when dropped.
///
/// Publishing consumes the staged file; dropping it without publishing
/// (a failed ledger write, a cancelled workflow) discards the bytes.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    len: u64,
    armed: bool,
}

impl StagedFile {
    pub(crate) fn new(path: PathBuf, len: u64) -> Self {
        Self {
            path,
            len,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes staged.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn set_len(&mut self, len: u64) {
        self.len = len;
    }

    /// Forget the file without removing it (it has been renamed away).
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove staged file");
            }
        }
    }
}

/// Random name for a new staged file.
pub(crate) fn staging_name() -> String {
    format!("{}.part", hex::encode(rand::random::<[u8; 16]>()))
}
