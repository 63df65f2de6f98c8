//! # credgate testkit
//!
//! Testing utilities for credgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A mediator on a manual clock, plus helpers that register
//!   parties and store credentials in one call
//! - **Ledgers**: An incentive ledger that can be taken offline or stalled
//! - **Generators**: Proptest strategies for principals, hashes, and
//!   consent durations
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use credgate_testkit::{TestFixture, DAY};
//!
//! async fn example() {
//!     let fx = TestFixture::new();
//!     let alice = fx.party("alice").await;
//!     let techcorp = fx.party("techcorp").await;
//!     let (diploma, hash) = fx.credential(&alice, "Bachelor_Diploma").await;
//!
//!     fx.grant(&alice, &techcorp, &diploma, 30 * DAY).await;
//!     let released = fx.mediator.access_data(&techcorp, &alice, &diploma).await.unwrap();
//!     assert_eq!(released, hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use credgate_testkit::generators::valid_duration;
//!
//! proptest! {
//!     #[test]
//!     fn grant_accepts_any_valid_duration(duration in valid_duration()) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod ledgers;

pub use fixtures::{multi_party, random_principal, TestFixture, DAY, FIXTURE_EPOCH};
pub use generators::GrantParams;
pub use ledgers::SwitchableLedger;
