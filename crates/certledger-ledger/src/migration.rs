//! Database schema migrations for the SQLite ledger.
//!
//! Versioned: each migration moves the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::BackendError;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<(), BackendError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(BackendError::BadData(format!(
            "ledger schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<(), BackendError> {
    match version {
        1 => apply_v1(conn),
        _ => Err(BackendError::BadData(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: initial schema.
fn apply_v1(conn: &Connection) -> Result<(), BackendError> {
    conn.execute_batch(
        r#"
        -- Ledger identity: network name and owner key
        CREATE TABLE ledger_meta (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL
        );

        -- Finalized certificate records, one per CID
        CREATE TABLE certificates (
            cid TEXT PRIMARY KEY,
            recipient TEXT NOT NULL,
            issuer TEXT NOT NULL,
            issued_at TEXT NOT NULL,
            valid INTEGER NOT NULL DEFAULT 1,
            tx_ref BLOB NOT NULL,             -- 32 bytes
            block INTEGER NOT NULL,
            recorded_at INTEGER NOT NULL      -- local time (Unix ms)
        );

        -- Every accepted submission, pending until confirmed or failed
        CREATE TABLE transactions (
            tx_ref BLOB PRIMARY KEY,          -- 32 bytes
            cid TEXT NOT NULL,
            canonical BLOB NOT NULL,          -- canonical CBOR submission
            signer BLOB NOT NULL,             -- 32 bytes, Ed25519 public key
            signature BLOB NOT NULL,          -- 64 bytes
            status TEXT NOT NULL CHECK (status IN ('pending', 'confirmed', 'failed')),
            block INTEGER,
            reason TEXT,
            submitted_at INTEGER NOT NULL
        );

        -- At most one in-flight write per CID
        CREATE UNIQUE INDEX idx_transactions_pending_cid
            ON transactions(cid) WHERE status = 'pending';
        CREATE INDEX idx_transactions_status ON transactions(status);
        "#,
    )?;

    Ok(())
}
