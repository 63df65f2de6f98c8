//! # credgate core
//!
//! Pure primitives for credgate: principals, hashes, identity/credential/
//! consent records, audit entries, and the validation rules over them.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Principal`] - Opaque 32-byte actor identifier
//! - [`Hash32`] - 32-byte digest; [`Hash32::ZERO`] is the empty hash
//! - [`CredentialType`] - Hashed credential label, e.g. `Bachelor_Diploma`
//! - [`ConsentKey`] / [`ConsentRecord`] - Who may read what, until when
//! - [`AccessLogEntry`] - One sealed, hash-chained audit record
//!
//! ## Consent windows
//!
//! A grant must last between [`MIN_DURATION`] and [`MAX_DURATION`] seconds
//! (inclusive), and is expired from its expiry instant onwards.

pub mod audit;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod event;
pub mod record;
pub mod types;
pub mod validation;

pub use audit::{
    find_chain_break, AccessAttempt, AccessLogEntry, REASON_CONSENT_INVALID,
    REASON_CREDENTIAL_MISSING, REASON_GRANTED, REASON_LOOKUP_FAILED,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::Hash32;
pub use error::{CoreError, ValidationError};
pub use event::Event;
pub use record::{
    ConsentKey, ConsentRecord, ConsentStatus, CredentialKey, CredentialRecord, IdentityRecord,
};
pub use types::{CredentialType, Principal, Timestamp};
pub use validation::{require_nonzero, validate_consent_window, MAX_DURATION, MIN_DURATION};
