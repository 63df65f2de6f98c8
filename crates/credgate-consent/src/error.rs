//! Error types for the registry and consent store.

use credgate_core::{CredentialType, Principal, ValidationError};
use credgate_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry and consent operations.
#[derive(Debug, Error)]
pub enum ConsentError {
    /// The principal already has an identity.
    #[error("principal {principal} is already registered")]
    AlreadyRegistered { principal: Principal },

    /// The principal has no identity.
    #[error("principal {principal} is not registered")]
    NotRegistered { principal: Principal },

    /// The granting owner has no identity.
    #[error("owner {owner} is not registered")]
    OwnerNotRegistered { owner: Principal },

    /// The receiving requester has no identity.
    #[error("requester {requester} is not registered")]
    RequesterNotRegistered { requester: Principal },

    /// No credential stored for this owner and type.
    #[error("credential {credential_type} not found for owner {owner}")]
    CredentialNotFound {
        owner: Principal,
        credential_type: CredentialType,
    },

    /// No live consent for this key.
    #[error("no consent from {owner} to {requester} for {credential_type}")]
    ConsentNotFound {
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
    },

    /// Input rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for registry and consent operations.
pub type Result<T> = std::result::Result<T, ConsentError>;
