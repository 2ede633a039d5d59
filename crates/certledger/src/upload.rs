//! Uploaded documents, as handed over by the transport layer.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

use certledger_core::{ContentId, Fingerprinter, ReadError};
use certledger_evidence::{sanitize_extension, EvidenceStore, StagedFile};

/// Where the uploaded bytes are.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Fully in memory.
    Bytes(Bytes),
    /// Spooled to a temporary file by the transport.
    File(PathBuf),
}

/// A single uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub source: UploadSource,
    /// Name the client gave the file.
    pub filename: Option<String>,
    /// Length the client declared, if any.
    pub declared_len: Option<u64>,
}

impl Upload {
    pub fn from_bytes(bytes: impl Into<Bytes>, filename: Option<&str>) -> Self {
        Self {
            source: UploadSource::Bytes(bytes.into()),
            filename: filename.map(str::to_owned),
            declared_len: None,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>, filename: Option<&str>) -> Self {
        Self {
            source: UploadSource::File(path.into()),
            filename: filename.map(str::to_owned),
            declared_len: None,
        }
    }

    pub fn with_declared_len(mut self, len: u64) -> Self {
        self.declared_len = Some(len);
        self
    }

    /// Extension the document is stored under.
    pub fn extension(&self) -> String {
        sanitize_extension(self.filename.as_deref())
    }

    /// Stream the upload through `fingerprinter`.
    pub async fn fingerprint(&self, fingerprinter: &Fingerprinter) -> Result<ContentId, ReadError> {
        match &self.source {
            UploadSource::Bytes(bytes) => fingerprinter.fingerprint(&bytes[..], self.declared_len),
            UploadSource::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                fingerprinter
                    .fingerprint_async(file, self.declared_len)
                    .await
            }
        }
    }

    /// [`fingerprint`](Self::fingerprint) bounded by `limit`.
    pub async fn fingerprint_within(
        &self,
        fingerprinter: &Fingerprinter,
        limit: Duration,
    ) -> Result<ContentId, ReadError> {
        tokio::time::timeout(limit, self.fingerprint(fingerprinter))
            .await
            .map_err(|_| ReadError::TimedOut(limit))?
    }

    /// Copy the upload into the store's staging area.
    pub async fn stage(&self, store: &EvidenceStore) -> certledger_evidence::Result<StagedFile> {
        match &self.source {
            UploadSource::Bytes(bytes) => store.stage_bytes(bytes).await,
            UploadSource::File(path) => store.stage_file(path).await,
        }
    }
}
