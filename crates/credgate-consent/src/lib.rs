//! # credgate consent
//!
//! The identity registry and the consent store.
//!
//! ## Key Types
//!
//! - [`IdentityRegistry`] - Registers principals and their credential hashes
//! - [`ConsentStore`] - Grants, renews, revokes, and evaluates consents
//! - [`EventBus`] - Broadcasts every committed state transition
//! - [`KeyedLocks`] - One async lock per logical key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use credgate_consent::{ConsentStore, EventBus, IdentityRegistry};
//! use credgate_core::{Clock, ConsentKey, CredentialType, Principal, SystemClock};
//! use credgate_store::MemoryStore;
//!
//! async fn example() {
//!     let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//!     let events = EventBus::default();
//!     let registry = IdentityRegistry::new(Arc::new(MemoryStore::new()), clock.clone(), events.clone());
//!     let consents = ConsentStore::new(registry, clock, events);
//!
//!     let key = ConsentKey::new(
//!         Principal::from_name("alice"),
//!         Principal::from_name("techcorp"),
//!         CredentialType::from_label("Bachelor_Diploma"),
//!     );
//!     let allowed = consents.check_consent(&key).await;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Per-key serialization**: every mutation holds the lock for its key
//!   from validation through the event emit, so events follow commit order
//! - **Lock-free checks**: `check_consent` reads the latest committed record
//!   without taking a lock, and fails closed on storage errors
//! - **Revocation is deletion**: a revoked consent has no record

pub mod consent;
pub mod error;
pub mod events;
pub mod identity;
pub mod locks;

pub use consent::ConsentStore;
pub use error::{ConsentError, Result};
pub use events::{EventBus, DEFAULT_EVENT_CAPACITY};
pub use identity::IdentityRegistry;
pub use locks::{KeyGuard, KeyedLocks};
