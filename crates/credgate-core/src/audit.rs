//! Access-log entries and their tamper-evident chaining.
//!
//! Every access attempt becomes one [`AccessLogEntry`]. Entries are sealed
//! into a hash chain when appended: each entry's digest covers its index, its
//! body, and the previous entry's digest, so editing, reordering, or dropping
//! any entry breaks every digest after it.
//!
//! Entry bodies are encoded as CBOR maps with small integer keys written in
//! ascending order, giving one byte string per entry on every platform.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::crypto::Hash32;
use crate::error::CoreError;
use crate::types::{CredentialType, Principal, Timestamp};

/// Reason recorded for a successful access.
pub const REASON_GRANTED: &str = "access_granted";

/// Reason recorded when no valid consent covers the request.
pub const REASON_CONSENT_INVALID: &str = "consent_invalid_or_expired";

/// Reason recorded when consent is valid but the credential is gone.
pub const REASON_CREDENTIAL_MISSING: &str = "credential_not_found";

/// Reason recorded when consent is valid but the credential could not be read.
pub const REASON_LOOKUP_FAILED: &str = "credential_lookup_failed";

/// Domain separator mixed into every chain digest.
const CHAIN_DOMAIN: &[u8] = b"credgate.audit.v1";

mod keys {
    pub const INDEX: u64 = 0;
    pub const OWNER: u64 = 1;
    pub const REQUESTER: u64 = 2;
    pub const CREDENTIAL_TYPE: u64 = 3;
    pub const CREDENTIAL_HASH: u64 = 4;
    pub const TIMESTAMP: u64 = 5;
    pub const GRANTED: u64 = 6;
    pub const REASON: u64 = 7;
}

/// An access attempt before it has a place in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttempt {
    pub owner: Principal,
    pub requester: Principal,
    pub credential_type: CredentialType,
    /// `Hash32::ZERO` when access was denied.
    pub credential_hash: Hash32,
    pub timestamp: Timestamp,
    pub granted: bool,
    pub reason: String,
}

impl AccessAttempt {
    /// A successful access that released `credential_hash`.
    pub fn granted(
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
        credential_hash: Hash32,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            owner,
            requester,
            credential_type,
            credential_hash,
            timestamp,
            granted: true,
            reason: REASON_GRANTED.to_string(),
        }
    }

    /// A refused access. No hash is released.
    pub fn denied(
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
        timestamp: Timestamp,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            requester,
            credential_type,
            credential_hash: Hash32::ZERO,
            timestamp,
            granted: false,
            reason: reason.into(),
        }
    }

    /// Canonical CBOR encoding of this attempt at position `index`.
    pub fn canonical_bytes(&self, index: u64) -> Result<Vec<u8>, CoreError> {
        let entries = vec![
            (Value::Integer(keys::INDEX.into()), Value::Integer(index.into())),
            (
                Value::Integer(keys::OWNER.into()),
                Value::Bytes(self.owner.0.to_vec()),
            ),
            (
                Value::Integer(keys::REQUESTER.into()),
                Value::Bytes(self.requester.0.to_vec()),
            ),
            (
                Value::Integer(keys::CREDENTIAL_TYPE.into()),
                Value::Bytes(self.credential_type.as_bytes().to_vec()),
            ),
            (
                Value::Integer(keys::CREDENTIAL_HASH.into()),
                Value::Bytes(self.credential_hash.0.to_vec()),
            ),
            (
                Value::Integer(keys::TIMESTAMP.into()),
                Value::Integer(self.timestamp.into()),
            ),
            (Value::Integer(keys::GRANTED.into()), Value::Bool(self.granted)),
            (
                Value::Integer(keys::REASON.into()),
                Value::Text(self.reason.clone()),
            ),
        ];

        let mut buf = Vec::new();
        ciborium::into_writer(&Value::Map(entries), &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Chain digest of this attempt at `index`, following `prev_digest`.
    pub fn chain_digest(&self, index: u64, prev_digest: &Hash32) -> Result<Hash32, CoreError> {
        let body = self.canonical_bytes(index)?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(CHAIN_DOMAIN);
        hasher.update(prev_digest.as_bytes());
        hasher.update(&body);
        Ok(Hash32(*hasher.finalize().as_bytes()))
    }

    /// Give the attempt its place in the log.
    pub fn seal(self, index: u64, prev_digest: Hash32) -> Result<AccessLogEntry, CoreError> {
        let digest = self.chain_digest(index, &prev_digest)?;
        Ok(AccessLogEntry {
            index,
            owner: self.owner,
            requester: self.requester,
            credential_type: self.credential_type,
            credential_hash: self.credential_hash,
            timestamp: self.timestamp,
            granted: self.granted,
            reason: self.reason,
            prev_digest,
            digest,
        })
    }
}

/// An immutable record of one access attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Zero-based position in the log.
    pub index: u64,
    pub owner: Principal,
    pub requester: Principal,
    pub credential_type: CredentialType,
    /// `Hash32::ZERO` when access was denied.
    pub credential_hash: Hash32,
    pub timestamp: Timestamp,
    pub granted: bool,
    pub reason: String,
    /// Digest of the previous entry (`ZERO` for the first).
    pub prev_digest: Hash32,
    pub digest: Hash32,
}

impl AccessLogEntry {
    /// The attempt this entry records.
    pub fn attempt(&self) -> AccessAttempt {
        AccessAttempt {
            owner: self.owner,
            requester: self.requester,
            credential_type: self.credential_type,
            credential_hash: self.credential_hash,
            timestamp: self.timestamp,
            granted: self.granted,
            reason: self.reason.clone(),
        }
    }

    /// Recompute the digest and compare with the stored one.
    pub fn is_intact(&self) -> bool {
        match self.attempt().chain_digest(self.index, &self.prev_digest) {
            Ok(digest) => digest == self.digest,
            Err(_) => false,
        }
    }

    /// Whether this entry is intact and sits at `index` right after an
    /// entry whose digest is `prev_digest`.
    pub fn follows(&self, index: u64, prev_digest: &Hash32) -> bool {
        self.index == index && self.prev_digest == *prev_digest && self.is_intact()
    }
}

/// Walk a log prefix from index 0 and return the first entry whose position,
/// link, or digest doesn't check out.
pub fn find_chain_break(entries: &[AccessLogEntry]) -> Option<u64> {
    let mut prev = Hash32::ZERO;
    for (position, entry) in entries.iter().enumerate() {
        if !entry.follows(position as u64, &prev) {
            return Some(position as u64);
        }
        prev = entry.digest;
    }
    None
}
