//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing and embedding. It has the same semantics as
//! SQLite but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use credgate_core::{
    AccessAttempt, AccessLogEntry, ConsentKey, ConsentRecord, CredentialKey, CredentialRecord,
    Hash32, IdentityRecord, Principal,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; each
/// trait method holds the lock for its whole step.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    identities: HashMap<Principal, IdentityRecord>,

    credentials: HashMap<CredentialKey, CredentialRecord>,

    consents: HashMap<ConsentKey, ConsentRecord>,

    /// The access log; position == entry index.
    log: Vec<AccessLogEntry>,

    /// Index: owner -> log positions.
    by_owner: HashMap<Principal, Vec<usize>>,

    /// Index: requester -> log positions.
    by_requester: HashMap<Principal, Vec<usize>>,
}

impl MemoryStoreInner {
    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<AccessLogEntry> {
        positions
            .map(|ps| ps.iter().filter_map(|&p| self.log.get(p).cloned()).collect())
            .unwrap_or_default()
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_identity(
        &self,
        principal: &Principal,
        record: &IdentityRecord,
    ) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.identities.contains_key(principal) {
            return Ok(InsertResult::AlreadyExists);
        }

        inner.identities.insert(*principal, *record);
        Ok(InsertResult::Inserted)
    }

    async fn get_identity(&self, principal: &Principal) -> Result<Option<IdentityRecord>> {
        let inner = self.read()?;
        Ok(inner.identities.get(principal).copied())
    }

    async fn has_identity(&self, principal: &Principal) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.identities.contains_key(principal))
    }

    async fn put_credential(&self, key: &CredentialKey, record: &CredentialRecord) -> Result<()> {
        let mut inner = self.write()?;
        inner.credentials.insert(*key, *record);
        Ok(())
    }

    async fn get_credential(&self, key: &CredentialKey) -> Result<Option<CredentialRecord>> {
        let inner = self.read()?;
        Ok(inner.credentials.get(key).copied())
    }

    async fn put_consent(
        &self,
        key: &ConsentKey,
        record: &ConsentRecord,
    ) -> Result<Option<ConsentRecord>> {
        let mut inner = self.write()?;
        Ok(inner.consents.insert(*key, *record))
    }

    async fn get_consent(&self, key: &ConsentKey) -> Result<Option<ConsentRecord>> {
        let inner = self.read()?;
        Ok(inner.consents.get(key).copied())
    }

    async fn delete_consent(&self, key: &ConsentKey) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner.consents.remove(key).is_some())
    }

    async fn append_access(&self, attempt: AccessAttempt) -> Result<AccessLogEntry> {
        let mut inner = self.write()?;

        let position = inner.log.len();
        let prev_digest = inner.log.last().map(|e| e.digest).unwrap_or(Hash32::ZERO);
        let entry = attempt.seal(position as u64, prev_digest)?;

        // Primary log and both indices change under the same write guard
        inner.by_owner.entry(entry.owner).or_default().push(position);
        inner
            .by_requester
            .entry(entry.requester)
            .or_default()
            .push(position);
        inner.log.push(entry.clone());

        Ok(entry)
    }

    async fn access_at(&self, index: u64) -> Result<Option<AccessLogEntry>> {
        let inner = self.read()?;
        let Ok(position) = usize::try_from(index) else {
            return Ok(None);
        };
        Ok(inner.log.get(position).cloned())
    }

    async fn access_count(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.log.len() as u64)
    }

    async fn access_range(&self, start: u64, end: u64) -> Result<Vec<AccessLogEntry>> {
        let inner = self.read()?;
        let len = inner.log.len();
        let start = usize::try_from(start).unwrap_or(len).min(len);
        let end = usize::try_from(end).unwrap_or(len).min(len);
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(inner.log[start..end].to_vec())
    }

    async fn accesses_by_owner(&self, owner: &Principal) -> Result<Vec<AccessLogEntry>> {
        let inner = self.read()?;
        Ok(inner.collect(inner.by_owner.get(owner)))
    }

    async fn accesses_by_requester(&self, requester: &Principal) -> Result<Vec<AccessLogEntry>> {
        let inner = self.read()?;
        Ok(inner.collect(inner.by_requester.get(requester)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgate_core::{find_chain_break, CredentialType, REASON_CONSENT_INVALID};

    fn identity(seed: u8) -> IdentityRecord {
        IdentityRecord {
            id_hash: Hash32::from_bytes([seed; 32]),
            email_hash: Hash32::from_bytes([seed + 1; 32]),
            secondary_id_hash: Hash32::from_bytes([seed + 2; 32]),
            registered_at: 1000,
        }
    }

    fn granted(owner: &str, requester: &str) -> AccessAttempt {
        AccessAttempt::granted(
            Principal::from_name(owner),
            Principal::from_name(requester),
            CredentialType::from_label("Bachelor_Diploma"),
            Hash32::digest(b"diploma"),
            1000,
        )
    }

    #[tokio::test]
    async fn test_identity_write_once() {
        let store = MemoryStore::new();
        let alice = Principal::from_name("alice");

        assert_eq!(
            store.insert_identity(&alice, &identity(1)).await.unwrap(),
            InsertResult::Inserted
        );
        assert_eq!(
            store.insert_identity(&alice, &identity(7)).await.unwrap(),
            InsertResult::AlreadyExists
        );

        // The first record wins
        assert_eq!(store.get_identity(&alice).await.unwrap(), Some(identity(1)));
        assert!(store.has_identity(&alice).await.unwrap());
        assert!(!store.has_identity(&Principal::from_name("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn test_consent_put_replace_delete() {
        let store = MemoryStore::new();
        let key = ConsentKey::new(
            Principal::from_name("alice"),
            Principal::from_name("techcorp"),
            CredentialType::from_label("Bachelor_Diploma"),
        );
        let first = ConsentRecord {
            expiry: 200_000,
            granted_at: 100,
        };
        let second = ConsentRecord {
            expiry: 300_000,
            granted_at: 150,
        };

        assert_eq!(store.put_consent(&key, &first).await.unwrap(), None);
        assert_eq!(store.put_consent(&key, &second).await.unwrap(), Some(first));
        assert_eq!(store.get_consent(&key).await.unwrap(), Some(second));

        assert!(store.delete_consent(&key).await.unwrap());
        assert!(!store.delete_consent(&key).await.unwrap());
        assert_eq!(store.get_consent(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_indexes_and_chains() {
        let store = MemoryStore::new();

        let e0 = store.append_access(granted("alice", "techcorp")).await.unwrap();
        let e1 = store.append_access(granted("bob", "techcorp")).await.unwrap();
        let e2 = store
            .append_access(AccessAttempt::denied(
                Principal::from_name("alice"),
                Principal::from_name("mallory"),
                CredentialType::from_label("Bachelor_Diploma"),
                1001,
                REASON_CONSENT_INVALID,
            ))
            .await
            .unwrap();

        assert_eq!((e0.index, e1.index, e2.index), (0, 1, 2));
        assert_eq!(e0.prev_digest, Hash32::ZERO);
        assert_eq!(e1.prev_digest, e0.digest);
        assert_eq!(store.access_count().await.unwrap(), 3);

        let alice = store
            .accesses_by_owner(&Principal::from_name("alice"))
            .await
            .unwrap();
        assert_eq!(alice.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 2]);

        let techcorp = store
            .accesses_by_requester(&Principal::from_name("techcorp"))
            .await
            .unwrap();
        assert_eq!(techcorp.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1]);

        let all = store.access_range(0, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(find_chain_break(&all), None);

        assert_eq!(store.access_at(1).await.unwrap(), Some(e1));
        assert_eq!(store.access_at(3).await.unwrap(), None);
        assert!(store.access_range(2, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_principal_has_no_logs() {
        let store = MemoryStore::new();
        assert!(store
            .accesses_by_owner(&Principal::from_name("nobody"))
            .await
            .unwrap()
            .is_empty());
    }

    const PARTIES: [&str; 4] = ["alice", "bob", "techcorp", "uni"];

    fn attempt(owner: usize, requester: usize, granted: bool, at: u64) -> AccessAttempt {
        let owner = Principal::from_name(PARTIES[owner]);
        let requester = Principal::from_name(PARTIES[requester]);
        let ty = CredentialType::from_label("Bachelor_Diploma");
        if granted {
            AccessAttempt::granted(owner, requester, ty, Hash32::digest(b"diploma"), at)
        } else {
            AccessAttempt::denied(owner, requester, ty, at, REASON_CONSENT_INVALID)
        }
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn test_appends_keep_chain_and_indices(
            ops in proptest::collection::vec((0..4usize, 0..4usize, proptest::bool::ANY), 0..40),
            window in (0u64..50, 0u64..50),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                for (at, (owner, requester, granted)) in ops.iter().enumerate() {
                    let entry = store
                        .append_access(attempt(*owner, *requester, *granted, at as u64))
                        .await
                        .unwrap();
                    assert_eq!(entry.index, at as u64);
                }

                let len = ops.len() as u64;
                assert_eq!(store.access_count().await.unwrap(), len);
                let all = store.access_range(0, len).await.unwrap();
                assert_eq!(find_chain_break(&all), None);

                let (start, end) = window;
                let slice = store.access_range(start, end).await.unwrap();
                let expected: Vec<_> = all
                    .iter()
                    .filter(|e| start <= e.index && e.index < end)
                    .cloned()
                    .collect();
                assert_eq!(slice, expected);

                for name in PARTIES {
                    let party = Principal::from_name(name);
                    let by_owner = store.accesses_by_owner(&party).await.unwrap();
                    let expected: Vec<_> =
                        all.iter().filter(|e| e.owner == party).cloned().collect();
                    assert_eq!(by_owner, expected);

                    let by_requester = store.accesses_by_requester(&party).await.unwrap();
                    let expected: Vec<_> =
                        all.iter().filter(|e| e.requester == party).cloned().collect();
                    assert_eq!(by_requester, expected);
                }
            });
        }
    }
}
