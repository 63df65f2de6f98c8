//! Input validation for registrations, credentials, and consent grants.

use crate::crypto::Hash32;
use crate::error::ValidationError;
use crate::types::{Principal, Timestamp};

/// Shortest consent a grant may create: one day.
pub const MIN_DURATION: u64 = 86_400;

/// Longest consent a grant may create: 365 days.
pub const MAX_DURATION: u64 = 31_536_000;

/// Reject the zero hash for the named argument.
pub fn require_nonzero(field: &'static str, hash: &Hash32) -> Result<(), ValidationError> {
    if hash.is_zero() {
        return Err(ValidationError::InvalidParameter { field });
    }
    Ok(())
}

/// Check the time window and parties of a consent grant.
///
/// Order matters and is observable: expiry, then duration bounds, then the
/// self-grant rule. Both duration bounds are inclusive.
pub fn validate_consent_window(
    owner: &Principal,
    requester: &Principal,
    expiry: Timestamp,
    now: Timestamp,
) -> Result<(), ValidationError> {
    // 1. Expiry must be strictly in the future
    if expiry <= now {
        return Err(ValidationError::InvalidExpiry { expiry, now });
    }

    // 2. Duration within [MIN_DURATION, MAX_DURATION]
    let duration = expiry - now;
    if !(MIN_DURATION..=MAX_DURATION).contains(&duration) {
        return Err(ValidationError::InvalidDuration {
            duration,
            min: MIN_DURATION,
            max: MAX_DURATION,
        });
    }

    // 3. No granting to yourself
    if owner == requester {
        return Err(ValidationError::SelfGrantForbidden { principal: *owner });
    }

    Ok(())
}
