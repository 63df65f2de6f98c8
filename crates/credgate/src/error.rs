//! Error types for the access mediator.

use credgate_consent::ConsentError;
use credgate_core::{CredentialType, Principal, ValidationError};
use credgate_store::StoreError;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors that can occur during mediator operations.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// Registry or consent error.
    #[error(transparent)]
    Consent(#[from] ConsentError),

    /// No valid consent covers the request. The denial has been logged,
    /// unless the log write itself failed.
    #[error("access denied: {requester} may not read {credential_type} of {owner}")]
    AccessDenied {
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
    },

    /// Log index past the end.
    #[error("log index {index} out of range (len {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    /// Ledger error on a read. Mint failures never surface here.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationError> for MediatorError {
    fn from(e: ValidationError) -> Self {
        MediatorError::Consent(ConsentError::Validation(e))
    }
}

/// Coarse classification of a [`MediatorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Registration state is wrong for the call.
    Registration,
    /// A record the call needs does not exist.
    Lookup,
    /// An argument was rejected.
    Validation,
    /// Consent is missing or expired.
    Authorization,
    /// An index is out of range.
    Bounds,
    /// Storage or ledger failure.
    Internal,
}

impl MediatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediatorError::Consent(e) => match e {
                ConsentError::AlreadyRegistered { .. }
                | ConsentError::NotRegistered { .. }
                | ConsentError::OwnerNotRegistered { .. }
                | ConsentError::RequesterNotRegistered { .. } => ErrorKind::Registration,
                ConsentError::CredentialNotFound { .. } | ConsentError::ConsentNotFound { .. } => {
                    ErrorKind::Lookup
                }
                ConsentError::Validation(_) => ErrorKind::Validation,
                ConsentError::Store(_) => ErrorKind::Internal,
            },
            MediatorError::AccessDenied { .. } => ErrorKind::Authorization,
            MediatorError::IndexOutOfRange { .. } => ErrorKind::Bounds,
            MediatorError::Ledger(_) | MediatorError::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for mediator operations.
pub type Result<T> = std::result::Result<T, MediatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let alice = Principal::from_name("alice");

        let e = MediatorError::from(ConsentError::AlreadyRegistered { principal: alice });
        assert_eq!(e.kind(), ErrorKind::Registration);

        let e = MediatorError::from(ValidationError::SelfGrantForbidden { principal: alice });
        assert_eq!(e.kind(), ErrorKind::Validation);

        let e = MediatorError::IndexOutOfRange { index: 3, len: 3 };
        assert_eq!(e.kind(), ErrorKind::Bounds);
        assert_eq!(e.to_string(), "log index 3 out of range (len 3)");

        let e = MediatorError::from(StoreError::InvalidData("bad".into()));
        assert_eq!(e.kind(), ErrorKind::Internal);
    }
}
