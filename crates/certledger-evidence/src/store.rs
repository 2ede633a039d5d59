//! The evidence store: `<root>/{issued,verify-submissions,.index,.staging}`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use certledger_core::ContentId;

use crate::error::{EvidenceError, Result};
use crate::namespace::{file_name, split_name, Namespace};
use crate::staging::{staging_name, StagedFile};

/// Directory holding staged uploads.
pub const STAGING_DIR: &str = ".staging";

/// Directory holding one marker per stored CID, naming its extension.
pub const INDEX_DIR: &str = ".index";

/// Content-addressed file cache.
///
/// Not a source of truth: entries here say nothing about whether a
/// document was issued. The ledger decides that.
///
/// Lookups go through `.index/<namespace>/<cid>`, whose content is the
/// extension the entry was published under, so finding an entry never
/// lists a namespace directory.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    root: PathBuf,
    /// Serializes replacing publishes so the index and directory agree.
    replace: Arc<Mutex<()>>,
}

impl EvidenceStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Leftover staged files from a previous run are discarded, and entries
    /// without an index marker get one.
    #[instrument]
    pub async fn open(root: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        match fs::metadata(&root).await {
            Ok(meta) if !meta.is_dir() => return Err(EvidenceError::NotADirectory(root)),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for ns in Namespace::ALL {
            fs::create_dir_all(root.join(ns.dir_name())).await?;
            fs::create_dir_all(root.join(INDEX_DIR).join(ns.dir_name())).await?;
        }
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;

        let mut stale = 0usize;
        let mut entries = fs::read_dir(&staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            if fs::remove_file(entry.path()).await.is_ok() {
                stale += 1;
            }
        }
        if stale > 0 {
            info!(stale, "discarded leftover staged files");
        }

        let store = Self {
            root,
            replace: Arc::new(Mutex::new(())),
        };
        for ns in Namespace::ALL {
            let indexed = store.reindex(ns).await?;
            if indexed > 0 {
                info!(%ns, indexed, "indexed unmarked evidence entries");
            }
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an entry lives (whether or not it exists).
    pub fn path_for(&self, ns: Namespace, cid: &ContentId, extension: &str) -> PathBuf {
        self.root.join(ns.dir_name()).join(file_name(cid, extension))
    }

    fn marker_path(&self, ns: Namespace, cid: &ContentId) -> PathBuf {
        self.root
            .join(INDEX_DIR)
            .join(ns.dir_name())
            .join(cid.to_string())
    }

    /// Find the entry for `cid` in `ns`, under any extension.
    pub async fn find(&self, ns: Namespace, cid: &ContentId) -> Result<Option<PathBuf>> {
        let Some(extension) = self.indexed_extension(ns, cid).await? else {
            return Ok(None);
        };
        let path = self.path_for(ns, cid, &extension);
        match fs::metadata(&path).await {
            Ok(_) => Ok(Some(path)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `ns` holds an entry for `cid`.
    pub async fn contains(&self, ns: Namespace, cid: &ContentId) -> Result<bool> {
        Ok(self.find(ns, cid).await?.is_some())
    }

    /// Read the entry for `cid` in `ns`.
    pub async fn read(&self, ns: Namespace, cid: &ContentId) -> Result<Option<Vec<u8>>> {
        match self.find(ns, cid).await? {
            Some(path) => match fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                // Replaced between lookup and reading.
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            None => Ok(None),
        }
    }

    /// Stage in-memory bytes.
    pub async fn stage_bytes(&self, bytes: &[u8]) -> Result<StagedFile> {
        let path = self.root.join(STAGING_DIR).join(staging_name());
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        let staged = StagedFile::new(path, bytes.len() as u64);
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(staged)
    }

    /// Stage a copy of an on-disk file.
    pub async fn stage_file(&self, source: &Path) -> Result<StagedFile> {
        let path = self.root.join(STAGING_DIR).join(staging_name());
        // Armed before the copy so a partial copy is cleaned up.
        let mut staged = StagedFile::new(path, 0);
        let len = fs::copy(source, staged.path()).await?;
        staged.set_len(len);
        Ok(staged)
    }

    /// Publish a staged file as the entry for `cid` in `ns`.
    ///
    /// `issued` is create-only: if an entry with this exact name exists the
    /// call fails with [`EvidenceError::AlreadyExists`] and leaves it
    /// untouched. `verify-submissions` replaces any existing entry for the
    /// CID, including one stored under a different extension.
    #[instrument(skip(self, staged, ns, cid), fields(%ns, %cid))]
    pub async fn publish(
        &self,
        staged: StagedFile,
        ns: Namespace,
        cid: &ContentId,
        extension: &str,
    ) -> Result<PathBuf> {
        let dest = self.path_for(ns, cid, extension);

        if ns.overwrite_allowed() {
            let _guard = self.replace.lock().await;
            let previous = self.indexed_extension(ns, cid).await?;

            fs::rename(staged.path(), &dest).await?;
            staged.disarm();
            self.write_marker(ns, cid, extension).await?;

            if let Some(previous) = previous.filter(|p| p != extension) {
                let stale = self.path_for(ns, cid, &previous);
                match fs::remove_file(&stale).await {
                    Ok(()) => debug!(path = %stale.display(), "replaced evidence removed"),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %stale.display(), error = %e, "failed to remove replaced evidence")
                    }
                }
            }
        } else {
            match fs::hard_link(staged.path(), &dest).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    return Err(EvidenceError::AlreadyExists(dest));
                }
                Err(e) => return Err(e.into()),
            }
            // The staged link is dropped (and removed) here.
            drop(staged);
            if self.indexed_extension(ns, cid).await?.is_none() {
                self.write_marker(ns, cid, extension).await?;
            }
        }

        debug!(path = %dest.display(), "evidence published");
        Ok(dest)
    }

    /// Stage and publish in one step.
    pub async fn store_bytes(
        &self,
        ns: Namespace,
        cid: &ContentId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let staged = self.stage_bytes(bytes).await?;
        self.publish(staged, ns, cid, extension).await
    }

    async fn indexed_extension(&self, ns: Namespace, cid: &ContentId) -> Result<Option<String>> {
        match fs::read_to_string(self.marker_path(ns, cid)).await {
            Ok(extension) => Ok(Some(extension)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Point the index at `extension`. Markers are swapped in by rename.
    async fn write_marker(&self, ns: Namespace, cid: &ContentId, extension: &str) -> Result<()> {
        let staged = self.stage_bytes(extension.as_bytes()).await?;
        fs::rename(staged.path(), self.marker_path(ns, cid)).await?;
        staged.disarm();
        Ok(())
    }

    /// Give every entry of `ns` that lacks a marker one. Returns how many
    /// markers were written.
    async fn reindex(&self, ns: Namespace) -> Result<usize> {
        let mut written = 0usize;
        let mut entries = fs::read_dir(self.root.join(ns.dir_name())).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let (cid, extension) = split_name(name);
            let Ok(cid) = ContentId::parse(cid) else {
                continue;
            };
            if self.indexed_extension(ns, &cid).await?.is_none() {
                self.write_marker(ns, &cid, extension).await?;
                written += 1;
            }
        }
        Ok(written)
    }
}
