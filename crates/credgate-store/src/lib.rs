//! # credgate store
//!
//! Storage abstraction for credgate. Provides a trait-based interface for
//! identities, credentials, consents, and the access log, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of a write-once insert
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credgate_store::{SqliteStore, Store};
//! use credgate_core::Principal;
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("credgate.db").unwrap();
//!
//!     let registered = store
//!         .has_identity(&Principal::from_name("alice"))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once identities**: a second insert returns `AlreadyExists`
//! - **Append-only log**: SQLite triggers reject `UPDATE` and `DELETE` on
//!   `access_log`; neither backend exposes a way to remove an entry
//! - **Secondary indices**: owner and requester lookups are served from
//!   indices maintained in the same atomic step as the append

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
