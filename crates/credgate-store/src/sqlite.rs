//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for credgate. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use credgate_core::{
    AccessAttempt, AccessLogEntry, ConsentKey, ConsentRecord, CredentialKey, CredentialRecord,
    CredentialType, Hash32, IdentityRecord, Principal,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

const ENTRY_COLUMNS: &str = "log_index, owner, requester, credential_type, credential_hash,
     timestamp, granted, reason, prev_digest, digest";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Each trait method runs as one
/// statement or one transaction while holding the connection.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(format!("spawn_blocking failed: {}", e)))?
    }
}

// Helper to read a 32-byte blob column
fn blob32(row: &Row<'_>, column: &str) -> rusqlite::Result<[u8; 32]> {
    let idx = row.as_ref().column_index(column)?;
    let bytes: Vec<u8> = row.get(idx)?;
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, column.into(), Type::Blob))
}

// Helper to read a non-negative integer column
fn uint(row: &Row<'_>, column: &str) -> rusqlite::Result<u64> {
    let idx = row.as_ref().column_index(column)?;
    let value: i64 = row.get(idx)?;
    u64::try_from(value)
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, column.into(), Type::Integer))
}

fn row_to_identity(row: &Row<'_>) -> rusqlite::Result<IdentityRecord> {
    Ok(IdentityRecord {
        id_hash: Hash32(blob32(row, "id_hash")?),
        email_hash: Hash32(blob32(row, "email_hash")?),
        secondary_id_hash: Hash32(blob32(row, "secondary_id_hash")?),
        registered_at: uint(row, "registered_at")?,
    })
}

fn row_to_credential(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    Ok(CredentialRecord {
        credential_hash: Hash32(blob32(row, "credential_hash")?),
        issued_at: uint(row, "issued_at")?,
    })
}

fn row_to_consent(row: &Row<'_>) -> rusqlite::Result<ConsentRecord> {
    Ok(ConsentRecord {
        expiry: uint(row, "expiry")?,
        granted_at: uint(row, "granted_at")?,
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AccessLogEntry> {
    Ok(AccessLogEntry {
        index: uint(row, "log_index")?,
        owner: Principal(blob32(row, "owner")?),
        requester: Principal(blob32(row, "requester")?),
        credential_type: CredentialType::from_bytes(blob32(row, "credential_type")?),
        credential_hash: Hash32(blob32(row, "credential_hash")?),
        timestamp: uint(row, "timestamp")?,
        granted: row.get::<_, i64>("granted")? != 0,
        reason: row.get("reason")?,
        prev_digest: Hash32(blob32(row, "prev_digest")?),
        digest: Hash32(blob32(row, "digest")?),
    })
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<AccessLogEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let entries = stmt
        .query_map(params, row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_identity(
        &self,
        principal: &Principal,
        record: &IdentityRecord,
    ) -> Result<InsertResult> {
        let principal = *principal;
        let record = *record;

        self.call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO identities (
                    principal, id_hash, email_hash, secondary_id_hash, registered_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    principal.0.as_slice(),
                    record.id_hash.0.as_slice(),
                    record.email_hash.0.as_slice(),
                    record.secondary_id_hash.0.as_slice(),
                    record.registered_at as i64,
                ],
            )?;

            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_identity(&self, principal: &Principal) -> Result<Option<IdentityRecord>> {
        let principal = *principal;

        self.call(move |conn| {
            conn.query_row(
                "SELECT id_hash, email_hash, secondary_id_hash, registered_at
                 FROM identities WHERE principal = ?1",
                params![principal.0.as_slice()],
                row_to_identity,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn has_identity(&self, principal: &Principal) -> Result<bool> {
        let principal = *principal;

        self.call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM identities WHERE principal = ?1)",
                params![principal.0.as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn put_credential(&self, key: &CredentialKey, record: &CredentialRecord) -> Result<()> {
        let key = *key;
        let record = *record;

        self.call(move |conn| {
            conn.execute(
                "INSERT INTO credentials (owner, credential_type, credential_hash, issued_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner, credential_type) DO UPDATE SET
                    credential_hash = excluded.credential_hash,
                    issued_at = excluded.issued_at",
                params![
                    key.owner.0.as_slice(),
                    key.credential_type.as_bytes().as_slice(),
                    record.credential_hash.0.as_slice(),
                    record.issued_at as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_credential(&self, key: &CredentialKey) -> Result<Option<CredentialRecord>> {
        let key = *key;

        self.call(move |conn| {
            conn.query_row(
                "SELECT credential_hash, issued_at FROM credentials
                 WHERE owner = ?1 AND credential_type = ?2",
                params![
                    key.owner.0.as_slice(),
                    key.credential_type.as_bytes().as_slice()
                ],
                row_to_credential,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn put_consent(
        &self,
        key: &ConsentKey,
        record: &ConsentRecord,
    ) -> Result<Option<ConsentRecord>> {
        let key = *key;
        let record = *record;

        self.call(move |conn| {
            let tx = conn.transaction()?;

            let previous = tx
                .query_row(
                    "SELECT expiry, granted_at FROM consents
                     WHERE owner = ?1 AND requester = ?2 AND credential_type = ?3",
                    params![
                        key.owner.0.as_slice(),
                        key.requester.0.as_slice(),
                        key.credential_type.as_bytes().as_slice(),
                    ],
                    row_to_consent,
                )
                .optional()?;

            tx.execute(
                "INSERT INTO consents (owner, requester, credential_type, expiry, granted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(owner, requester, credential_type) DO UPDATE SET
                    expiry = excluded.expiry,
                    granted_at = excluded.granted_at",
                params![
                    key.owner.0.as_slice(),
                    key.requester.0.as_slice(),
                    key.credential_type.as_bytes().as_slice(),
                    record.expiry as i64,
                    record.granted_at as i64,
                ],
            )?;

            tx.commit()?;
            Ok(previous)
        })
        .await
    }

    async fn get_consent(&self, key: &ConsentKey) -> Result<Option<ConsentRecord>> {
        let key = *key;

        self.call(move |conn| {
            conn.query_row(
                "SELECT expiry, granted_at FROM consents
                 WHERE owner = ?1 AND requester = ?2 AND credential_type = ?3",
                params![
                    key.owner.0.as_slice(),
                    key.requester.0.as_slice(),
                    key.credential_type.as_bytes().as_slice(),
                ],
                row_to_consent,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_consent(&self, key: &ConsentKey) -> Result<bool> {
        let key = *key;

        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM consents
                 WHERE owner = ?1 AND requester = ?2 AND credential_type = ?3",
                params![
                    key.owner.0.as_slice(),
                    key.requester.0.as_slice(),
                    key.credential_type.as_bytes().as_slice(),
                ],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn append_access(&self, attempt: AccessAttempt) -> Result<AccessLogEntry> {
        self.call(move |conn| {
            let tx = conn.transaction()?;

            let last: Option<(i64, Vec<u8>)> = tx
                .query_row(
                    "SELECT log_index, digest FROM access_log ORDER BY log_index DESC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (index, prev_digest) = match last {
                None => (0, Hash32::ZERO),
                Some((last_index, digest)) => {
                    let prev = Hash32::try_from(digest.as_slice()).map_err(|_| {
                        StoreError::InvalidData(format!(
                            "access_log digest at {} is not 32 bytes",
                            last_index
                        ))
                    })?;
                    (last_index as u64 + 1, prev)
                }
            };

            let entry = attempt.seal(index, prev_digest)?;

            tx.execute(
                "INSERT INTO access_log (
                    log_index, owner, requester, credential_type, credential_hash,
                    timestamp, granted, reason, prev_digest, digest
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    entry.index as i64,
                    entry.owner.0.as_slice(),
                    entry.requester.0.as_slice(),
                    entry.credential_type.as_bytes().as_slice(),
                    entry.credential_hash.0.as_slice(),
                    entry.timestamp as i64,
                    entry.granted as i64,
                    entry.reason.as_str(),
                    entry.prev_digest.0.as_slice(),
                    entry.digest.0.as_slice(),
                ],
            )?;

            tx.commit()?;
            Ok(entry)
        })
        .await
    }

    async fn access_at(&self, index: u64) -> Result<Option<AccessLogEntry>> {
        let Ok(index) = i64::try_from(index) else {
            return Ok(None);
        };

        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM access_log WHERE log_index = ?1", ENTRY_COLUMNS),
                params![index],
                row_to_entry,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn access_count(&self) -> Result<u64> {
        self.call(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM access_log", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn access_range(&self, start: u64, end: u64) -> Result<Vec<AccessLogEntry>> {
        let start = i64::try_from(start).unwrap_or(i64::MAX);
        let end = i64::try_from(end).unwrap_or(i64::MAX);

        self.call(move |conn| {
            query_entries(
                conn,
                &format!(
                    "SELECT {} FROM access_log WHERE log_index >= ?1 AND log_index < ?2
                     ORDER BY log_index",
                    ENTRY_COLUMNS
                ),
                params![start, end],
            )
        })
        .await
    }

    async fn accesses_by_owner(&self, owner: &Principal) -> Result<Vec<AccessLogEntry>> {
        let owner = *owner;

        self.call(move |conn| {
            query_entries(
                conn,
                &format!(
                    "SELECT {} FROM access_log WHERE owner = ?1 ORDER BY log_index",
                    ENTRY_COLUMNS
                ),
                params![owner.0.as_slice()],
            )
        })
        .await
    }

    async fn accesses_by_requester(&self, requester: &Principal) -> Result<Vec<AccessLogEntry>> {
        let requester = *requester;

        self.call(move |conn| {
            query_entries(
                conn,
                &format!(
                    "SELECT {} FROM access_log WHERE requester = ?1 ORDER BY log_index",
                    ENTRY_COLUMNS
                ),
                params![requester.0.as_slice()],
            )
        })
        .await
    }
}
