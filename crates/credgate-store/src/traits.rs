//! Store trait: the abstract interface for credgate persistence.
//!
//! This trait allows the engine to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use credgate_core::{
    AccessAttempt, AccessLogEntry, ConsentKey, ConsentRecord, CredentialKey, CredentialRecord,
    IdentityRecord, Principal,
};

use crate::error::Result;

/// Result of inserting a write-once record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted.
    Inserted,
    /// A record already exists under this key; nothing was written.
    AlreadyExists,
}

/// The Store trait: async interface for credgate persistence.
///
/// Every method is a single atomic step against the backend. Callers that
/// need read-validate-write sequences hold their own per-key locks.
///
/// # Design Notes
///
/// - **Write-once identities**: `insert_identity` never overwrites.
/// - **Overwrite-only credentials**: there is no way to delete a credential.
/// - **Deletion as revocation**: `delete_consent` removes the record entirely.
/// - **Append-only log**: entries get consecutive indices from 0 and are
///   sealed into the hash chain inside the same atomic step that stores them,
///   together with the owner and requester indices.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an identity if the principal has none.
    async fn insert_identity(
        &self,
        principal: &Principal,
        record: &IdentityRecord,
    ) -> Result<InsertResult>;

    /// Get a principal's identity.
    async fn get_identity(&self, principal: &Principal) -> Result<Option<IdentityRecord>>;

    /// Check whether a principal has an identity.
    async fn has_identity(&self, principal: &Principal) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Create or replace a credential record.
    async fn put_credential(&self, key: &CredentialKey, record: &CredentialRecord) -> Result<()>;

    /// Get a credential record.
    async fn get_credential(&self, key: &CredentialKey) -> Result<Option<CredentialRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Consents
    // ─────────────────────────────────────────────────────────────────────────

    /// Create or replace a consent record. Returns the record it replaced.
    async fn put_consent(
        &self,
        key: &ConsentKey,
        record: &ConsentRecord,
    ) -> Result<Option<ConsentRecord>>;

    /// Get a consent record.
    async fn get_consent(&self, key: &ConsentKey) -> Result<Option<ConsentRecord>>;

    /// Delete a consent record. Returns whether one existed.
    async fn delete_consent(&self, key: &ConsentKey) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Access log
    // ─────────────────────────────────────────────────────────────────────────

    /// Seal and append an access attempt. Returns the stored entry.
    async fn append_access(&self, attempt: AccessAttempt) -> Result<AccessLogEntry>;

    /// Get the entry at `index`.
    async fn access_at(&self, index: u64) -> Result<Option<AccessLogEntry>>;

    /// Number of entries in the log.
    async fn access_count(&self) -> Result<u64>;

    /// Entries with `start <= index < end`, ordered by index.
    async fn access_range(&self, start: u64, end: u64) -> Result<Vec<AccessLogEntry>>;

    /// All entries for an owner, ordered by index.
    async fn accesses_by_owner(&self, owner: &Principal) -> Result<Vec<AccessLogEntry>>;

    /// All entries for a requester, ordered by index.
    async fn accesses_by_requester(&self, requester: &Principal) -> Result<Vec<AccessLogEntry>>;
}
