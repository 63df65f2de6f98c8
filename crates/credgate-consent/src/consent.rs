//! Consent lifecycle: grant, renew, revoke, expire.
//!
//! Per key the state machine is
//!
//! ```text
//! NoConsent --grant--> Active --revoke--> NoConsent
//!                        |
//!                        +----time----> Expired
//! ```
//!
//! and any state returns to `Active` on a fresh grant, which fully
//! overwrites the previous record.

use std::sync::Arc;

use credgate_core::{
    validate_consent_window, Clock, ConsentKey, ConsentRecord, ConsentStatus, Event, Timestamp,
};
use credgate_store::Store;

use crate::error::{ConsentError, Result};
use crate::events::EventBus;
use crate::identity::IdentityRegistry;
use crate::locks::KeyedLocks;

/// Stores and evaluates consent records.
pub struct ConsentStore<S: Store> {
    registry: IdentityRegistry<S>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    locks: Arc<KeyedLocks<ConsentKey>>,
}

impl<S: Store> Clone for ConsentStore<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            clock: Arc::clone(&self.clock),
            events: self.events.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: Store> ConsentStore<S> {
    pub fn new(registry: IdentityRegistry<S>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            registry,
            clock,
            events,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    fn store(&self) -> &S {
        self.registry.store()
    }

    /// Grant or renew consent for `key` until `expiry`.
    ///
    /// Checks run in a fixed order: owner registered, requester registered,
    /// credential present, then the time window and self-grant rule. The
    /// first failing check is the error returned.
    pub async fn set_consent(&self, key: &ConsentKey, expiry: Timestamp) -> Result<ConsentRecord> {
        let _guard = self.locks.lock(*key).await;

        if !self.store().has_identity(&key.owner).await? {
            return Err(ConsentError::OwnerNotRegistered { owner: key.owner });
        }
        if !self.store().has_identity(&key.requester).await? {
            return Err(ConsentError::RequesterNotRegistered {
                requester: key.requester,
            });
        }
        if self
            .store()
            .get_credential(&key.credential_key())
            .await?
            .is_none()
        {
            return Err(ConsentError::CredentialNotFound {
                owner: key.owner,
                credential_type: key.credential_type,
            });
        }

        let now = self.clock.now();
        validate_consent_window(&key.owner, &key.requester, expiry, now)?;

        let record = ConsentRecord {
            expiry,
            granted_at: now,
        };
        let previous = self.store().put_consent(key, &record).await?;

        tracing::info!(
            owner = %key.owner,
            requester = %key.requester,
            credential_type = %key.credential_type,
            expiry,
            renewed = previous.is_some(),
            "consent granted"
        );
        self.events.emit(Event::ConsentGranted {
            owner: key.owner,
            requester: key.requester,
            credential_type: key.credential_type,
            expiry,
        });

        Ok(record)
    }

    /// Remove the consent for `key`. Expired records can still be revoked.
    pub async fn revoke_consent(&self, key: &ConsentKey) -> Result<()> {
        let _guard = self.locks.lock(*key).await;

        if !self.store().delete_consent(key).await? {
            return Err(not_found(key));
        }

        tracing::info!(
            owner = %key.owner,
            requester = %key.requester,
            credential_type = %key.credential_type,
            "consent revoked"
        );
        self.events.emit(Event::ConsentRevoked {
            owner: key.owner,
            requester: key.requester,
            credential_type: key.credential_type,
        });

        Ok(())
    }

    /// Whether `key` is usable right now.
    pub async fn check_consent(&self, key: &ConsentKey) -> bool {
        self.check_consent_at(key, self.clock.now()).await
    }

    /// Whether `key` is usable at `now`.
    ///
    /// Never fails: a storage error is logged and reads as no consent.
    pub async fn check_consent_at(&self, key: &ConsentKey, now: Timestamp) -> bool {
        match self.store().get_consent(key).await {
            Ok(record) => {
                let active = record.is_some_and(|r| r.is_active_at(now));
                tracing::debug!(
                    owner = %key.owner,
                    requester = %key.requester,
                    active,
                    "consent checked"
                );
                active
            }
            Err(e) => {
                tracing::error!(
                    owner = %key.owner,
                    requester = %key.requester,
                    error = %e,
                    "consent lookup failed, denying"
                );
                false
            }
        }
    }

    /// Stored expiry for `key`, whether or not it has passed.
    pub async fn consent_expiry(&self, key: &ConsentKey) -> Result<Timestamp> {
        self.consent(key)
            .await?
            .map(|record| record.expiry)
            .ok_or_else(|| not_found(key))
    }

    /// Where `key` sits in its lifecycle right now.
    pub async fn consent_status(&self, key: &ConsentKey) -> Result<ConsentStatus> {
        let record = self.consent(key).await?;
        Ok(ConsentStatus::at(record.as_ref(), self.clock.now()))
    }

    pub async fn consent(&self, key: &ConsentKey) -> Result<Option<ConsentRecord>> {
        Ok(self.store().get_consent(key).await?)
    }

    /// The registry this store validates parties against.
    pub fn registry(&self) -> &IdentityRegistry<S> {
        &self.registry
    }
}

fn not_found(key: &ConsentKey) -> ConsentError {
    ConsentError::ConsentNotFound {
        owner: key.owner,
        requester: key.requester,
        credential_type: key.credential_type,
    }
}
