//! Per-CID serialization of in-process workflows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use certledger_core::ContentId;

/// One async lock per CID, created on demand and dropped with its last user.
#[derive(Debug, Default)]
pub struct CidLocks {
    locks: Mutex<HashMap<ContentId, Weak<AsyncMutex<()>>>>,
}

impl CidLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `cid`.
    pub async fn lock(&self, cid: ContentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            match locks.get(&cid).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    locks.retain(|_, weak| weak.strong_count() > 0);
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(cid, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// CIDs with a live lock.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
