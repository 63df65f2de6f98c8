//! Events emitted by state transitions.
//!
//! Events are the observable side of every committed mutation. They are
//! emitted after the write they describe, never before.

use serde::{Deserialize, Serialize};

use crate::crypto::Hash32;
use crate::types::{CredentialType, Principal, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A principal registered its identity.
    Registered { principal: Principal, id_hash: Hash32 },

    /// A credential was stored or replaced.
    CredentialStored {
        owner: Principal,
        credential_type: CredentialType,
        credential_hash: Hash32,
    },

    /// A consent was granted or renewed.
    ConsentGranted {
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
        expiry: Timestamp,
    },

    /// A consent was revoked.
    ConsentRevoked {
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
    },

    /// An access attempt was appended to the audit log.
    AccessLogged {
        index: u64,
        owner: Principal,
        requester: Principal,
        credential_type: CredentialType,
        granted: bool,
        reason: String,
    },

    /// A grant reward was minted.
    RewardIssued { owner: Principal, amount: u64 },

    /// A grant reward could not be minted; the consent stands.
    RewardPending {
        owner: Principal,
        amount: u64,
        reason: String,
    },
}

impl Event {
    /// Short machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Registered { .. } => "registered",
            Event::CredentialStored { .. } => "credential_stored",
            Event::ConsentGranted { .. } => "consent_granted",
            Event::ConsentRevoked { .. } => "consent_revoked",
            Event::AccessLogged { .. } => "access_logged",
            Event::RewardIssued { .. } => "reward_issued",
            Event::RewardPending { .. } => "reward_pending",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = Event::ConsentRevoked {
            owner: Principal::from_bytes([1; 32]),
            requester: Principal::from_bytes([2; 32]),
            credential_type: CredentialType::from_bytes([3; 32]),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("ConsentRevoked").is_some());
        assert_eq!(event.name(), "consent_revoked");
    }
}
