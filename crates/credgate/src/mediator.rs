//! The access mediator: the single entry point for grants, revocations, and
//! audited credential access.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use credgate_consent::{ConsentError, ConsentStore, EventBus, IdentityRegistry};
use credgate_core::{
    AccessAttempt, AccessLogEntry, Clock, ConsentKey, ConsentRecord, ConsentStatus,
    CredentialRecord, CredentialType, Event, Hash32, IdentityRecord, Principal, SystemClock,
    Timestamp, REASON_CONSENT_INVALID, REASON_CREDENTIAL_MISSING, REASON_LOOKUP_FAILED,
};
use credgate_store::Store;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::audit::{AuditLog, ChainStatus};
use crate::config::MediatorConfig;
use crate::error::{MediatorError, Result};
use crate::ledger::{reward_id, IncentiveLedger, PendingReward, RewardStatus};

/// What a successful grant produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReceipt {
    pub key: ConsentKey,
    pub consent: ConsentRecord,
    pub reward: RewardStatus,
}

/// Mediates every interaction between owners, requesters, and the ledger.
///
/// Grants commit the consent before minting the owner's reward; a mint that
/// fails or times out leaves the consent in place and queues the reward.
/// Every `access_data` call appends exactly one audit entry, including the
/// calls that are refused. A refusal is returned as a refusal even when its
/// entry cannot be written; the failed write is logged at `error!`.
pub struct AccessMediator<S: Store, L: IncentiveLedger> {
    registry: IdentityRegistry<S>,
    consents: ConsentStore<S>,
    audit: AuditLog<S>,
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: MediatorConfig,
    pending: Mutex<Vec<PendingReward>>,
    reward_seq: AtomicU64,
}

impl<S: Store, L: IncentiveLedger> AccessMediator<S, L> {
    /// Create a mediator on the system clock.
    pub fn new(store: S, ledger: L, config: MediatorConfig) -> Self {
        Self::with_clock(store, ledger, config, Arc::new(SystemClock))
    }

    /// Create a mediator on an explicit clock.
    pub fn with_clock(store: S, ledger: L, config: MediatorConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(store);
        let events = EventBus::new(config.event_capacity);
        let registry = IdentityRegistry::new(Arc::clone(&store), Arc::clone(&clock), events.clone());
        let consents = ConsentStore::new(registry.clone(), Arc::clone(&clock), events.clone());
        let audit = AuditLog::new(store, events.clone());

        Self {
            registry,
            consents,
            audit,
            ledger: Arc::new(ledger),
            clock,
            events,
            config,
            pending: Mutex::new(Vec::new()),
            reward_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn registry(&self) -> &IdentityRegistry<S> {
        &self.registry
    }

    pub fn consents(&self) -> &ConsentStore<S> {
        &self.consents
    }

    pub fn audit(&self) -> &AuditLog<S> {
        &self.audit
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register(
        &self,
        principal: &Principal,
        id_hash: Hash32,
        email_hash: Hash32,
        secondary_id_hash: Hash32,
    ) -> Result<IdentityRecord> {
        Ok(self
            .registry
            .register(principal, id_hash, email_hash, secondary_id_hash)
            .await?)
    }

    pub async fn store_credential(
        &self,
        principal: &Principal,
        credential_type: &CredentialType,
        credential_hash: Hash32,
    ) -> Result<CredentialRecord> {
        Ok(self
            .registry
            .store_credential(principal, credential_type, credential_hash)
            .await?)
    }

    pub async fn is_registered(&self, principal: &Principal) -> bool {
        self.registry.is_registered(principal).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consent
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `requester` access to `owner`'s credential until `expiry`, then
    /// reward the owner.
    ///
    /// Renewing an existing grant is a fresh grant and is rewarded again.
    pub async fn grant_and_reward(
        &self,
        owner: &Principal,
        requester: &Principal,
        credential_type: &CredentialType,
        expiry: Timestamp,
    ) -> Result<GrantReceipt> {
        let key = ConsentKey::new(*owner, *requester, *credential_type);
        let consent = self.consents.set_consent(&key, expiry).await?;
        let reward = self.reward(&key, &consent).await;

        Ok(GrantReceipt {
            key,
            consent,
            reward,
        })
    }

    /// Withdraw a grant. Rewards already minted are kept.
    pub async fn revoke(
        &self,
        owner: &Principal,
        requester: &Principal,
        credential_type: &CredentialType,
    ) -> Result<()> {
        let key = ConsentKey::new(*owner, *requester, *credential_type);
        Ok(self.consents.revoke_consent(&key).await?)
    }

    /// Whether `requester` currently holds a valid consent. Logs nothing.
    pub async fn can_access(
        &self,
        owner: &Principal,
        requester: &Principal,
        credential_type: &CredentialType,
    ) -> bool {
        let key = ConsentKey::new(*owner, *requester, *credential_type);
        self.consents.check_consent(&key).await
    }

    pub async fn consent_expiry(
        &self,
        owner: &Principal,
        requester: &Principal,
        credential_type: &CredentialType,
    ) -> Result<Timestamp> {
        let key = ConsentKey::new(*owner, *requester, *credential_type);
        Ok(self.consents.consent_expiry(&key).await?)
    }

    pub async fn consent_status(
        &self,
        owner: &Principal,
        requester: &Principal,
        credential_type: &CredentialType,
    ) -> Result<ConsentStatus> {
        let key = ConsentKey::new(*owner, *requester, *credential_type);
        Ok(self.consents.consent_status(&key).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Release the hash of `owner`'s credential to `requester`.
    ///
    /// Exactly one audit entry is committed per call, before it returns,
    /// unless the store refuses the write. A granted access is only returned
    /// once its entry is stored.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if no active consent covers the request
    /// - `CredentialNotFound` if consent is valid but the credential is gone
    /// - `Store` if the credential could not be read, or the grant could not
    ///   be logged
    pub async fn access_data(
        &self,
        requester: &Principal,
        owner: &Principal,
        credential_type: &CredentialType,
    ) -> Result<Hash32> {
        let key = ConsentKey::new(*owner, *requester, *credential_type);
        let now = self.clock.now();
        let denied = |reason: &str| {
            AccessAttempt::denied(*owner, *requester, *credential_type, now, reason)
        };

        if !self.consents.check_consent_at(&key, now).await {
            self.record_denial(denied(REASON_CONSENT_INVALID)).await;
            return Err(MediatorError::AccessDenied {
                owner: *owner,
                requester: *requester,
                credential_type: *credential_type,
            });
        }

        let credential = match self.registry.credential(owner, credential_type).await {
            Ok(credential) => credential,
            Err(e) => {
                self.record_denial(denied(REASON_LOOKUP_FAILED)).await;
                return Err(e.into());
            }
        };

        let Some(credential) = credential else {
            self.record_denial(denied(REASON_CREDENTIAL_MISSING)).await;
            return Err(ConsentError::CredentialNotFound {
                owner: *owner,
                credential_type: *credential_type,
            }
            .into());
        };

        self.audit
            .record(AccessAttempt::granted(
                *owner,
                *requester,
                *credential_type,
                credential.credential_hash,
                now,
            ))
            .await?;

        Ok(credential.credential_hash)
    }

    /// Log a refused access. The refusal stands whether or not this succeeds.
    async fn record_denial(&self, attempt: AccessAttempt) {
        let (owner, requester) = (attempt.owner, attempt.requester);
        let reason = attempt.reason.clone();
        if let Err(e) = self.audit.record(attempt).await {
            tracing::error!(
                owner = %owner,
                requester = %requester,
                reason = %reason,
                error = %e,
                "denied access could not be logged"
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Audit Log
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn logs_for_owner(&self, owner: &Principal) -> Result<Vec<AccessLogEntry>> {
        self.audit.logs_for_owner(owner).await
    }

    pub async fn logs_for_requester(&self, requester: &Principal) -> Result<Vec<AccessLogEntry>> {
        self.audit.logs_for_requester(requester).await
    }

    pub async fn log_by_index(&self, index: u64) -> Result<AccessLogEntry> {
        self.audit.log_by_index(index).await
    }

    pub async fn log_count(&self) -> Result<u64> {
        self.audit.log_count().await
    }

    pub async fn verify_chain(&self) -> Result<ChainStatus> {
        self.audit.verify_chain().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rewards
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn balance_of(&self, principal: &Principal) -> Result<u64> {
        Ok(self.ledger.balance_of(principal).await?)
    }

    /// Rewards whose mint failed or timed out, oldest first.
    pub fn pending_rewards(&self) -> Vec<PendingReward> {
        self.pending().clone()
    }

    /// Retry every queued reward. Returns how many were minted; the rest stay
    /// queued.
    pub async fn settle_pending_rewards(&self) -> usize {
        let queued = std::mem::take(&mut *self.pending());
        let mut settled = 0;
        let mut still_pending = Vec::new();

        for mut reward in queued {
            match self.mint(&reward.reward_id, &reward.owner, reward.amount).await {
                Ok(balance) => {
                    settled += 1;
                    self.issued(&reward.owner, reward.amount, balance);
                }
                Err(reason) => {
                    reward.reason = reason;
                    still_pending.push(reward);
                }
            }
        }

        if !still_pending.is_empty() {
            tracing::warn!(remaining = still_pending.len(), "rewards still pending");
            // Keep queue order: retried rewards are older than any queued meanwhile
            let mut pending = self.pending();
            still_pending.append(&mut *pending);
            *pending = still_pending;
        }

        settled
    }

    async fn reward(&self, key: &ConsentKey, consent: &ConsentRecord) -> RewardStatus {
        let owner = &key.owner;
        let amount = self.config.reward_amount;
        let seq = self.reward_seq.fetch_add(1, Ordering::Relaxed);
        let id = reward_id(key, consent, seq);

        match self.mint(&id, owner, amount).await {
            Ok(balance) => {
                self.issued(owner, amount, balance);
                RewardStatus::Issued { amount }
            }
            Err(reason) => {
                tracing::warn!(owner = %owner, amount, reason = %reason, "reward queued");
                self.pending().push(PendingReward {
                    reward_id: id,
                    owner: *owner,
                    amount,
                    reason: reason.clone(),
                    queued_at: self.clock.now(),
                });
                self.events.emit(Event::RewardPending {
                    owner: *owner,
                    amount,
                    reason: reason.clone(),
                });
                RewardStatus::Pending { reason }
            }
        }
    }

    /// Mint with the configured timeout. Errors are flattened to a reason.
    ///
    /// A timed-out mint may still land; retries reuse `reward_id` so the
    /// ledger can tell.
    async fn mint(
        &self,
        reward_id: &Hash32,
        owner: &Principal,
        amount: u64,
    ) -> std::result::Result<u64, String> {
        let timeout = self.config.mint_timeout();
        match tokio::time::timeout(timeout, self.ledger.mint(reward_id, owner, amount)).await {
            Ok(Ok(balance)) => Ok(balance),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("mint timed out after {}ms", timeout.as_millis())),
        }
    }

    fn issued(&self, owner: &Principal, amount: u64, balance: u64) {
        tracing::info!(owner = %owner, amount, balance, "reward issued");
        self.events.emit(Event::RewardIssued {
            owner: *owner,
            amount,
        });
    }

    fn pending(&self) -> MutexGuard<'_, Vec<PendingReward>> {
        // A panic mid-push cannot leave the queue half-written
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
