//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use credgate::{AccessMediator, GrantReceipt, IncentiveLedger, MediatorConfig, MemoryLedger};
use credgate_core::{Clock, CredentialType, Hash32, ManualClock, Principal, Timestamp};
use credgate_store::{MemoryStore, Store};

/// Start time of every fixture clock.
pub const FIXTURE_EPOCH: Timestamp = 1_700_000_000;

/// One day in seconds.
pub const DAY: u64 = 86_400;

/// A mediator on a manual clock.
pub struct TestFixture<S: Store = MemoryStore, L: IncentiveLedger = MemoryLedger> {
    pub mediator: AccessMediator<S, L>,
    pub clock: ManualClock,
}

impl TestFixture {
    /// In-memory store and ledger, default config.
    pub fn new() -> Self {
        Self::with_config(MediatorConfig::default())
    }

    pub fn with_config(config: MediatorConfig) -> Self {
        Self::with_parts(MemoryStore::new(), MemoryLedger::new(), config)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store, L: IncentiveLedger> TestFixture<S, L> {
    /// Any store and ledger. The clock starts at [`FIXTURE_EPOCH`].
    pub fn with_parts(store: S, ledger: L, config: MediatorConfig) -> Self {
        let clock = ManualClock::new(FIXTURE_EPOCH);
        let mediator = AccessMediator::with_clock(store, ledger, config, Arc::new(clock.clone()));
        Self { mediator, clock }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register a principal named `name` with hashes derived from the name.
    ///
    /// # Panics
    ///
    /// If registration fails.
    pub async fn party(&self, name: &str) -> Principal {
        let principal = Principal::from_name(name);
        self.mediator
            .register(
                &principal,
                Hash32::digest(format!("{name}/id").as_bytes()),
                Hash32::digest(format!("{name}/email").as_bytes()),
                Hash32::digest(format!("{name}/secondary").as_bytes()),
            )
            .await
            .unwrap_or_else(|e| panic!("registering {name}: {e}"));
        principal
    }

    /// Store a credential labelled `label` for `owner`. Returns its type and
    /// hash.
    pub async fn credential(&self, owner: &Principal, label: &str) -> (CredentialType, Hash32) {
        let ty = CredentialType::from_label(label);
        let hash = Hash32::digest(format!("{}/{label}", owner.to_hex()).as_bytes());
        self.mediator
            .store_credential(owner, &ty, hash)
            .await
            .unwrap_or_else(|e| panic!("storing {label}: {e}"));
        (ty, hash)
    }

    /// Grant consent lasting `duration` seconds from now.
    pub async fn grant(
        &self,
        owner: &Principal,
        requester: &Principal,
        credential_type: &CredentialType,
        duration: u64,
    ) -> GrantReceipt {
        self.mediator
            .grant_and_reward(owner, requester, credential_type, self.now() + duration)
            .await
            .unwrap_or_else(|e| panic!("granting consent: {e}"))
    }
}

/// Names for `count` distinct parties: `party-0`, `party-1`, ...
pub fn multi_party(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("party-{i}")).collect()
}

/// A principal nobody has registered.
pub fn random_principal() -> Principal {
    Principal::from_bytes(rand::random())
}
