//! Ledgers that misbehave on request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use credgate::{IncentiveLedger, LedgerError, MemoryLedger};
use credgate_core::{Hash32, Principal};

/// A [`MemoryLedger`] that can be taken offline or made to stall.
///
/// While offline, `mint` fails with `Unavailable`. While stalled, `mint`
/// sleeps for an hour before doing anything, which trips any sane timeout.
/// Balance reads are never affected.
#[derive(Debug, Default)]
pub struct SwitchableLedger {
    inner: MemoryLedger,
    offline: AtomicBool,
    stalled: AtomicBool,
}

impl SwitchableLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }
}

#[async_trait]
impl IncentiveLedger for SwitchableLedger {
    async fn mint(
        &self,
        reward_id: &Hash32,
        principal: &Principal,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        self.inner.mint(reward_id, principal, amount).await
    }

    async fn balance_of(&self, principal: &Principal) -> Result<u64, LedgerError> {
        self.inner.balance_of(principal).await
    }
}
