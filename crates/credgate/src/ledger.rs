//! The incentive ledger contract and an in-memory ledger.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use credgate_core::{ConsentKey, ConsentRecord, Hash32, Principal, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a ledger may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Crediting would overflow the balance.
    #[error("balance overflow for {principal}: {balance} + {amount}")]
    Overflow {
        principal: Principal,
        balance: u64,
        amount: u64,
    },

    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Domain separator for reward ids.
const REWARD_DOMAIN: &[u8] = b"credgate.reward.v1";

/// Identifier of one grant's reward.
///
/// Covers the consent key, the committed record, and a per-mediator
/// sequence number, so a renewal gets a fresh id while every retry of the
/// same reward reuses it.
pub fn reward_id(key: &ConsentKey, consent: &ConsentRecord, seq: u64) -> Hash32 {
    let mut buf = Vec::with_capacity(REWARD_DOMAIN.len() + 3 * 32 + 3 * 8);
    buf.extend_from_slice(REWARD_DOMAIN);
    buf.extend_from_slice(key.owner.as_bytes());
    buf.extend_from_slice(key.requester.as_bytes());
    buf.extend_from_slice(key.credential_type.as_bytes());
    buf.extend_from_slice(&consent.granted_at.to_be_bytes());
    buf.extend_from_slice(&consent.expiry.to_be_bytes());
    buf.extend_from_slice(&seq.to_be_bytes());
    Hash32::digest(&buf)
}

/// A token ledger that credits owners for granting access.
///
/// Implementations are external collaborators; the mediator is the only
/// caller of [`mint`](IncentiveLedger::mint).
#[async_trait]
pub trait IncentiveLedger: Send + Sync {
    /// Credit `amount` to `principal` for the reward `reward_id`. Returns the
    /// new balance.
    ///
    /// The mediator stops waiting after its mint timeout, and a mint it gave
    /// up on may still have been applied. It retries with the same
    /// `reward_id`, so implementations must credit each id at most once: a
    /// repeated id returns the current balance and credits nothing.
    async fn mint(
        &self,
        reward_id: &Hash32,
        principal: &Principal,
        amount: u64,
    ) -> Result<u64, LedgerError>;

    /// Current balance. Unknown principals have zero.
    async fn balance_of(&self, principal: &Principal) -> Result<u64, LedgerError>;
}

#[derive(Debug, Default)]
struct Balances {
    by_principal: HashMap<Principal, u64>,
    applied: HashSet<Hash32>,
}

/// In-memory ledger. Remembers every reward id it has credited.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<Balances>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all balances, saturating at `u64::MAX`.
    pub fn total_supply(&self) -> u64 {
        self.state
            .read()
            .map(|s| {
                s.by_principal
                    .values()
                    .fold(0u64, |total, balance| total.saturating_add(*balance))
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl IncentiveLedger for MemoryLedger {
    async fn mint(
        &self,
        reward_id: &Hash32,
        principal: &Principal,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".into()))?;
        let Balances {
            by_principal,
            applied,
        } = &mut *state;

        let balance = by_principal.entry(*principal).or_default();
        if applied.contains(reward_id) {
            return Ok(*balance);
        }

        let credited = balance.checked_add(amount).ok_or(LedgerError::Overflow {
            principal: *principal,
            balance: *balance,
            amount,
        })?;
        *balance = credited;
        applied.insert(*reward_id);
        Ok(credited)
    }

    async fn balance_of(&self, principal: &Principal) -> Result<u64, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|_| LedgerError::Unavailable("lock poisoned".into()))?;
        Ok(state.by_principal.get(principal).copied().unwrap_or_default())
    }
}

/// A grant reward that could not be minted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReward {
    /// Passed to every retry of this reward.
    pub reward_id: Hash32,
    pub owner: Principal,
    pub amount: u64,
    /// Why the mint did not go through.
    pub reason: String,
    pub queued_at: Timestamp,
}

/// Outcome of the reward half of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardStatus {
    /// Minted.
    Issued { amount: u64 },
    /// Queued for a later [`settle_pending_rewards`](crate::AccessMediator::settle_pending_rewards).
    Pending { reason: String },
}

impl RewardStatus {
    pub fn is_issued(&self) -> bool {
        matches!(self, RewardStatus::Issued { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgate_core::CredentialType;

    fn id(n: u8) -> Hash32 {
        Hash32::from_bytes([n; 32])
    }

    #[tokio::test]
    async fn test_mint_accumulates() {
        let ledger = MemoryLedger::new();
        let alice = Principal::from_name("alice");

        assert_eq!(ledger.balance_of(&alice).await.unwrap(), 0);
        assert_eq!(ledger.mint(&id(1), &alice, 10).await.unwrap(), 10);
        assert_eq!(ledger.mint(&id(2), &alice, 10).await.unwrap(), 20);
        assert_eq!(ledger.balance_of(&alice).await.unwrap(), 20);
        assert_eq!(ledger.total_supply(), 20);
    }

    #[tokio::test]
    async fn test_mint_overflow_leaves_balance() {
        let ledger = MemoryLedger::new();
        let alice = Principal::from_name("alice");
        ledger.mint(&id(1), &alice, u64::MAX - 1).await.unwrap();

        let err = ledger.mint(&id(2), &alice, 2).await.unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { amount: 2, .. }));
        assert_eq!(ledger.balance_of(&alice).await.unwrap(), u64::MAX - 1);

        // A rejected id was never applied and can still go through later
        assert_eq!(ledger.mint(&id(2), &alice, 1).await.unwrap(), u64::MAX);
    }

    #[tokio::test]
    async fn test_repeated_reward_id_credits_once() {
        let ledger = MemoryLedger::new();
        let alice = Principal::from_name("alice");

        assert_eq!(ledger.mint(&id(9), &alice, 10).await.unwrap(), 10);
        assert_eq!(ledger.mint(&id(9), &alice, 10).await.unwrap(), 10);
        assert_eq!(ledger.total_supply(), 10);
    }

    #[tokio::test]
    async fn test_total_supply_saturates() {
        let ledger = MemoryLedger::new();
        ledger
            .mint(&id(1), &Principal::from_name("alice"), u64::MAX)
            .await
            .unwrap();
        ledger
            .mint(&id(2), &Principal::from_name("bob"), u64::MAX)
            .await
            .unwrap();

        assert_eq!(ledger.total_supply(), u64::MAX);
    }

    #[test]
    fn test_reward_id_distinguishes_grants() {
        let key = ConsentKey::new(
            Principal::from_name("alice"),
            Principal::from_name("techcorp"),
            CredentialType::from_label("Bachelor_Diploma"),
        );
        let consent = ConsentRecord {
            expiry: 2_000,
            granted_at: 1_000,
        };
        let renewed = ConsentRecord {
            expiry: 3_000,
            ..consent
        };

        assert_eq!(reward_id(&key, &consent, 0), reward_id(&key, &consent, 0));
        assert_ne!(reward_id(&key, &consent, 0), reward_id(&key, &consent, 1));
        assert_ne!(reward_id(&key, &consent, 0), reward_id(&key, &renewed, 0));
    }
}
