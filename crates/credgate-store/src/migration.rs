//! Versioned SQLite schema.
//!
//! `schema_migrations` records every version applied. Opening a database
//! applies the missing versions in one transaction and refuses a schema
//! newer than this build understands.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
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
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_secs()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One identity per principal, written once
        CREATE TABLE identities (
            principal BLOB PRIMARY KEY,          -- 32 bytes
            id_hash BLOB NOT NULL,
            email_hash BLOB NOT NULL,
            secondary_id_hash BLOB NOT NULL,
            registered_at INTEGER NOT NULL       -- unix seconds
        );

        -- Credential digests, overwritten on update
        CREATE TABLE credentials (
            owner BLOB NOT NULL,
            credential_type BLOB NOT NULL,
            credential_hash BLOB NOT NULL,
            issued_at INTEGER NOT NULL,
            PRIMARY KEY (owner, credential_type)
        );

        -- Live consents; revocation deletes the row
        CREATE TABLE consents (
            owner BLOB NOT NULL,
            requester BLOB NOT NULL,
            credential_type BLOB NOT NULL,
            expiry INTEGER NOT NULL,
            granted_at INTEGER NOT NULL,
            PRIMARY KEY (owner, requester, credential_type)
        );

        -- Append-only, hash-chained access log
        CREATE TABLE access_log (
            log_index INTEGER PRIMARY KEY,       -- 0-based, consecutive
            owner BLOB NOT NULL,
            requester BLOB NOT NULL,
            credential_type BLOB NOT NULL,
            credential_hash BLOB NOT NULL,       -- zero when denied
            timestamp INTEGER NOT NULL,
            granted INTEGER NOT NULL,            -- 0=denied, 1=granted
            reason TEXT NOT NULL,
            prev_digest BLOB NOT NULL,
            digest BLOB NOT NULL
        );

        CREATE INDEX idx_access_log_owner ON access_log(owner, log_index);
        CREATE INDEX idx_access_log_requester ON access_log(requester, log_index);

        CREATE TRIGGER identities_no_update BEFORE UPDATE ON identities
        BEGIN SELECT RAISE(ABORT, 'identities are write-once'); END;

        CREATE TRIGGER identities_no_delete BEFORE DELETE ON identities
        BEGIN SELECT RAISE(ABORT, 'identities are write-once'); END;

        CREATE TRIGGER credentials_no_delete BEFORE DELETE ON credentials
        BEGIN SELECT RAISE(ABORT, 'credentials cannot be deleted'); END;

        CREATE TRIGGER access_log_no_update BEFORE UPDATE ON access_log
        BEGIN SELECT RAISE(ABORT, 'access_log is append-only'); END;

        CREATE TRIGGER access_log_no_delete BEFORE DELETE ON access_log
        BEGIN SELECT RAISE(ABORT, 'access_log is append-only'); END;
        "#,
    )?;

    Ok(())
}

/// Get current time in seconds.
fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"identities".to_string()));
        assert!(tables.contains(&"credentials".to_string()));
        assert!(tables.contains(&"consents".to_string()));
        assert!(tables.contains(&"access_log".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_access_log_rejects_delete() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO access_log VALUES (0, x'00', x'00', x'00', x'00', 0, 0, 'r', x'00', x'00')",
            [],
        )
        .unwrap();

        assert!(conn.execute("DELETE FROM access_log", []).is_err());
        assert!(conn
            .execute("UPDATE access_log SET granted = 1", [])
            .is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM access_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
