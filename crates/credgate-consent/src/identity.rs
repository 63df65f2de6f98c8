//! Identity registry: who exists, and which credential digests they hold.

use std::sync::Arc;

use credgate_core::{
    require_nonzero, Clock, CredentialKey, CredentialRecord, CredentialType, Event, Hash32,
    IdentityRecord, Principal,
};
use credgate_store::{InsertResult, Store};

use crate::error::{ConsentError, Result};
use crate::events::EventBus;
use crate::locks::KeyedLocks;

/// Registers principals and stores their credential hashes.
///
/// Cheap to clone; clones share the store, clock, event bus, and locks.
pub struct IdentityRegistry<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    principal_locks: Arc<KeyedLocks<Principal>>,
    credential_locks: Arc<KeyedLocks<CredentialKey>>,
}

impl<S: Store> Clone for IdentityRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            events: self.events.clone(),
            principal_locks: Arc::clone(&self.principal_locks),
            credential_locks: Arc::clone(&self.credential_locks),
        }
    }
}

impl<S: Store> IdentityRegistry<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            store,
            clock,
            events,
            principal_locks: Arc::new(KeyedLocks::new()),
            credential_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Register `principal` with its identity attestations.
    ///
    /// A registered principal is refused with `AlreadyRegistered` whatever
    /// the arguments; otherwise every hash must be non-zero.
    pub async fn register(
        &self,
        principal: &Principal,
        id_hash: Hash32,
        email_hash: Hash32,
        secondary_id_hash: Hash32,
    ) -> Result<IdentityRecord> {
        let _guard = self.principal_locks.lock(*principal).await;

        if self.store.has_identity(principal).await? {
            return Err(ConsentError::AlreadyRegistered {
                principal: *principal,
            });
        }

        require_nonzero("id_hash", &id_hash)?;
        require_nonzero("email_hash", &email_hash)?;
        require_nonzero("secondary_id_hash", &secondary_id_hash)?;

        let record = IdentityRecord {
            id_hash,
            email_hash,
            secondary_id_hash,
            registered_at: self.clock.now(),
        };

        match self.store.insert_identity(principal, &record).await? {
            InsertResult::Inserted => {}
            InsertResult::AlreadyExists => {
                return Err(ConsentError::AlreadyRegistered {
                    principal: *principal,
                })
            }
        }

        tracing::info!(principal = %principal, "principal registered");
        self.events.emit(Event::Registered {
            principal: *principal,
            id_hash,
        });

        Ok(record)
    }

    /// Store or replace the hash of one of `principal`'s credentials.
    pub async fn store_credential(
        &self,
        principal: &Principal,
        credential_type: &CredentialType,
        credential_hash: Hash32,
    ) -> Result<CredentialRecord> {
        let key = CredentialKey::new(*principal, *credential_type);
        let _guard = self.credential_locks.lock(key).await;

        if !self.store.has_identity(principal).await? {
            return Err(ConsentError::NotRegistered {
                principal: *principal,
            });
        }

        require_nonzero("credential_type", &credential_type.hash())?;
        require_nonzero("credential_hash", &credential_hash)?;

        let record = CredentialRecord {
            credential_hash,
            issued_at: self.clock.now(),
        };
        self.store.put_credential(&key, &record).await?;

        tracing::info!(
            owner = %principal,
            credential_type = %credential_type,
            "credential stored"
        );
        self.events.emit(Event::CredentialStored {
            owner: *principal,
            credential_type: *credential_type,
            credential_hash,
        });

        Ok(record)
    }

    /// The stored hash for `(owner, credential_type)`.
    pub async fn credential_hash(
        &self,
        owner: &Principal,
        credential_type: &CredentialType,
    ) -> Result<Hash32> {
        self.credential(owner, credential_type)
            .await?
            .map(|record| record.credential_hash)
            .ok_or(ConsentError::CredentialNotFound {
                owner: *owner,
                credential_type: *credential_type,
            })
    }

    /// The full credential record, if any.
    pub async fn credential(
        &self,
        owner: &Principal,
        credential_type: &CredentialType,
    ) -> Result<Option<CredentialRecord>> {
        let key = CredentialKey::new(*owner, *credential_type);
        Ok(self.store.get_credential(&key).await?)
    }

    /// A principal's identity record, if registered.
    pub async fn identity(&self, principal: &Principal) -> Result<Option<IdentityRecord>> {
        Ok(self.store.get_identity(principal).await?)
    }

    /// Whether `principal` is registered. A storage failure reads as `false`.
    pub async fn is_registered(&self, principal: &Principal) -> bool {
        match self.store.has_identity(principal).await {
            Ok(registered) => registered,
            Err(e) => {
                tracing::error!(principal = %principal, error = %e, "registration lookup failed");
                false
            }
        }
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }
}
