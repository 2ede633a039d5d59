//! SQLite implementation of the ledger contract.
//!
//! A single-node development ledger: submissions are accepted into a
//! `transactions` table as pending and become certificate records when
//! confirmed. rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use certledger_core::{ContentId, PublicKey, Signature, SignedSubmission, TransactionRef};

use crate::backend::{
    BackendResult, Confirmation, LedgerBackend, LedgerInfo, RawCertificate, SUPERSEDED,
};
use crate::error::BackendError;
use crate::migration;

const META_OWNER: &str = "owner";
const META_NETWORK: &str = "network";

/// Network name recorded by [`SqliteLedger::initialize`] when none is given.
pub const DEFAULT_NETWORK: &str = "certledger-dev";

/// SQLite-backed ledger.
///
/// Thread-safe via an internal mutex. Clones share the same connection.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open a ledger database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory ledger. Useful for testing.
    pub fn open_memory() -> BackendResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record the ledger owner and network name.
    ///
    /// Re-initializing with the same owner is a no-op; a different owner is
    /// refused.
    pub fn initialize(&self, owner: PublicKey, network: &str) -> BackendResult<()> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        match read_owner(&tx)? {
            Some(existing) if existing == owner => return Ok(()),
            Some(existing) => {
                return Err(BackendError::Unauthorized(format!(
                    "ledger already owned by {existing}"
                )))
            }
            None => {}
        }

        tx.execute(
            "INSERT INTO ledger_meta (key, value) VALUES (?1, ?2)",
            params![META_OWNER, owner.0.as_slice()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO ledger_meta (key, value) VALUES (?1, ?2)",
            params![META_NETWORK, network.as_bytes()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Number of finalized certificate records.
    pub fn record_count(&self) -> BackendResult<u64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM certificates", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Flip the validity flag of an existing record. Returns whether a
    /// record was found.
    pub fn set_validity(&self, cid: &ContentId, valid: bool) -> BackendResult<bool> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute(
            "UPDATE certificates SET valid = ?2 WHERE cid = ?1",
            params![cid.to_string(), valid],
        )?;
        Ok(changed > 0)
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> BackendResult<T>
    where
        F: FnOnce(&mut Connection) -> BackendResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| BackendError::Unreachable(format!("spawn_blocking failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> BackendResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| BackendError::Unreachable(format!("connection mutex poisoned: {e}")))
}

fn read_owner(conn: &Connection) -> BackendResult<Option<PublicKey>> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT value FROM ledger_meta WHERE key = ?1",
            params![META_OWNER],
            |row| row.get(0),
        )
        .optional()?;

    bytes
        .map(|b| {
            let arr: [u8; 32] = b
                .try_into()
                .map_err(|_| BackendError::BadData("owner key is not 32 bytes".into()))?;
            Ok(PublicKey::from_bytes(arr))
        })
        .transpose()
}

fn read_network(conn: &Connection) -> BackendResult<String> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT value FROM ledger_meta WHERE key = ?1",
            params![META_NETWORK],
            |row| row.get(0),
        )
        .optional()?;

    match bytes {
        Some(b) => String::from_utf8(b)
            .map_err(|_| BackendError::BadData("network name is not UTF-8".into())),
        None => Ok(DEFAULT_NETWORK.to_owned()),
    }
}

fn certificate_present(conn: &Connection, cid: &str) -> BackendResult<bool> {
    let present: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM certificates WHERE cid = ?1)",
        params![cid],
        |row| row.get(0),
    )?;
    Ok(present)
}

#[async_trait]
impl LedgerBackend for SqliteLedger {
    async fn handshake(&self) -> BackendResult<LedgerInfo> {
        self.blocking(|conn| {
            let owner = read_owner(conn)?
                .ok_or_else(|| BackendError::BadData("ledger has no owner; run init-ledger".into()))?;
            let network = read_network(conn)?;
            Ok(LedgerInfo { network, owner })
        })
        .await
    }

    async fn certificate_exists(&self, cid: &ContentId) -> BackendResult<bool> {
        let cid = cid.to_string();
        self.blocking(move |conn| certificate_present(conn, &cid)).await
    }

    async fn read_certificate(&self, cid: &ContentId) -> BackendResult<RawCertificate> {
        let cid = cid.to_string();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT recipient, issuer, issued_at, valid FROM certificates WHERE cid = ?1",
                    params![cid],
                    |row| {
                        Ok(RawCertificate {
                            recipient: row.get(0)?,
                            issuer: row.get(1)?,
                            issued_at: row.get(2)?,
                            valid: row.get(3)?,
                        })
                    },
                )
                .optional()?;

            // Unset slots read as the zero value.
            Ok(row.unwrap_or_default())
        })
        .await
    }

    async fn send_submission(&self, signed: &SignedSubmission) -> BackendResult<TransactionRef> {
        signed
            .verify()
            .map_err(|e| BackendError::Unauthorized(e.to_string()))?;

        let signed = signed.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let owner = read_owner(&tx)?
                .ok_or_else(|| BackendError::BadData("ledger has no owner".into()))?;
            if signed.signer != owner {
                return Err(BackendError::Unauthorized(format!(
                    "{} is not the ledger owner",
                    signed.signer
                )));
            }

            let tx_ref = signed.transaction_ref();
            let known: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM transactions WHERE tx_ref = ?1)",
                params![tx_ref.0.as_slice()],
                |row| row.get(0),
            )?;
            if known {
                // Resending an identical signed submission is idempotent.
                return Ok(tx_ref);
            }

            let cid = signed.submission.cid;
            let cid_str = cid.to_string();
            if certificate_present(&tx, &cid_str)? {
                return Err(BackendError::AlreadyExists(cid));
            }

            let superseded = tx.execute(
                "UPDATE transactions SET status = 'failed', reason = ?2
                 WHERE cid = ?1 AND status = 'pending'",
                params![cid_str, SUPERSEDED],
            )?;
            if superseded > 0 {
                debug!(%cid, superseded, "stale pending submission replaced");
            }

            tx.execute(
                "INSERT INTO transactions (
                    tx_ref, cid, canonical, signer, signature, status, submitted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                params![
                    tx_ref.0.as_slice(),
                    cid_str,
                    signed.canonical.as_slice(),
                    signed.signer.0.as_slice(),
                    signed.signature.0.as_slice(),
                    chrono::Utc::now().timestamp_millis(),
                ],
            )?;
            tx.commit()?;

            debug!(%cid, tx = %tx_ref, "submission accepted");
            Ok(tx_ref)
        })
        .await
    }

    async fn await_confirmation(&self, tx_ref: &TransactionRef) -> BackendResult<Confirmation> {
        let tx_ref = *tx_ref;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let row: Option<(String, Option<i64>, Option<String>, Vec<u8>, Vec<u8>, Vec<u8>)> = tx
                .query_row(
                    "SELECT status, block, reason, canonical, signer, signature
                     FROM transactions WHERE tx_ref = ?1",
                    params![tx_ref.0.as_slice()],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .optional()?;

            let (status, block, reason, canonical, signer, signature) = row
                .ok_or_else(|| BackendError::BadData(format!("unknown transaction {tx_ref}")))?;

            match status.as_str() {
                "confirmed" => {
                    return Ok(Confirmation::Confirmed {
                        block: block.unwrap_or_default() as u64,
                    })
                }
                "failed" => {
                    return Ok(Confirmation::Failed {
                        reason: reason.unwrap_or_default(),
                    })
                }
                _ => {}
            }

            let signer: [u8; 32] = signer
                .try_into()
                .map_err(|_| BackendError::BadData("stored signer is not 32 bytes".into()))?;
            let signature: Signature = signature
                .as_slice()
                .try_into()
                .map_err(|_| BackendError::BadData("stored signature is not 64 bytes".into()))?;
            let signed =
                SignedSubmission::from_parts(canonical, PublicKey::from_bytes(signer), signature)
                    .map_err(|e| BackendError::BadData(e.to_string()))?;
            let record = signed.submission.into_record();
            let cid_str = record.cid.to_string();

            if certificate_present(&tx, &cid_str)? {
                let reason = "certificate already exists".to_owned();
                tx.execute(
                    "UPDATE transactions SET status = 'failed', reason = ?2 WHERE tx_ref = ?1",
                    params![tx_ref.0.as_slice(), reason],
                )?;
                tx.commit()?;
                return Ok(Confirmation::Failed { reason });
            }

            let block: i64 = tx.query_row(
                "SELECT COALESCE(MAX(block), 0) + 1 FROM transactions",
                [],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO certificates (
                    cid, recipient, issuer, issued_at, valid, tx_ref, block, recorded_at
                ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7)",
                params![
                    cid_str,
                    record.recipient,
                    record.issuer,
                    record.issued_at,
                    tx_ref.0.as_slice(),
                    block,
                    chrono::Utc::now().timestamp_millis(),
                ],
            )?;
            tx.execute(
                "UPDATE transactions SET status = 'confirmed', block = ?2 WHERE tx_ref = ?1",
                params![tx_ref.0.as_slice(), block],
            )?;
            tx.commit()?;

            debug!(cid = %record.cid, block, "submission confirmed");
            Ok(Confirmation::Confirmed { block: block as u64 })
        })
        .await
    }
}
