//! Error types for credgate core.

use thiserror::Error;

use crate::types::{Principal, Timestamp};

/// Input validation failures. None of these are retryable without changing
/// the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid parameter: {field} must not be the zero hash")]
    InvalidParameter { field: &'static str },

    #[error("invalid expiry: {expiry} is not after now ({now})")]
    InvalidExpiry { expiry: Timestamp, now: Timestamp },

    #[error("invalid duration: {duration}s is outside [{min}s, {max}s]")]
    InvalidDuration { duration: u64, min: u64, max: u64 },

    #[error("self grant forbidden for principal {principal}")]
    SelfGrantForbidden { principal: Principal },
}

/// Encoding failures for canonical bytes.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
