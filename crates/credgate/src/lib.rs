//! # credgate
//!
//! Consent-gated access to credential hashes.
//!
//! ## Overview
//!
//! An owner registers an identity and stores hashes of their credentials.
//! They then grant other principals time-bounded, revocable permission to
//! read one of those hashes, and are credited on an incentive ledger for
//! every grant. Each read attempt, allowed or refused, lands in an
//! append-only, hash-chained audit log.
//!
//! ## Key Types
//!
//! - [`AccessMediator`] - The façade every caller goes through
//! - [`AuditLog`] - Queries over the access log, and chain verification
//! - [`IncentiveLedger`] - The reward ledger contract; [`MemoryLedger`] implements it
//! - [`MediatorConfig`] - Reward amount, mint timeout, event buffer size
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credgate::{AccessMediator, MediatorConfig, MemoryLedger};
//! use credgate::core::{CredentialType, Hash32, Principal};
//! use credgate::store::SqliteStore;
//!
//! async fn example() -> credgate::Result<()> {
//!     let store = SqliteStore::open("credgate.db")?;
//!     let mediator = AccessMediator::new(store, MemoryLedger::new(), MediatorConfig::default());
//!
//!     let alice = Principal::from_name("alice");
//!     let techcorp = Principal::from_name("techcorp");
//!     let diploma = CredentialType::from_label("Bachelor_Diploma");
//!
//!     mediator
//!         .register(&alice, Hash32::digest(b"id"), Hash32::digest(b"mail"), Hash32::digest(b"sid"))
//!         .await?;
//!     mediator
//!         .store_credential(&alice, &diploma, Hash32::digest(b"diploma.pdf"))
//!         .await?;
//!
//!     // ... register techcorp, grant_and_reward, then:
//!     let hash = mediator.access_data(&techcorp, &alice, &diploma).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `credgate::core` - Types, records, validation rules
//! - `credgate::store` - Storage trait, SQLite and in-memory backends
//! - `credgate::consent` - Identity registry and consent store

pub mod audit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod mediator;

pub use credgate_consent as consent;
pub use credgate_core as core;
pub use credgate_store as store;

pub use audit::{AuditLog, ChainStatus};
pub use config::MediatorConfig;
pub use error::{ErrorKind, MediatorError, Result};
pub use ledger::{
    reward_id, IncentiveLedger, LedgerError, MemoryLedger, PendingReward, RewardStatus,
};
pub use mediator::{AccessMediator, GrantReceipt};

pub use credgate_core::{
    AccessLogEntry, ConsentStatus, CredentialType, Event, Hash32, Principal, Timestamp,
    MAX_DURATION, MIN_DURATION,
};
