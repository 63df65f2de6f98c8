//! Identity, credential, and consent records.

use serde::{Deserialize, Serialize};

use crate::crypto::Hash32;
use crate::types::{CredentialType, Principal, Timestamp};

/// Attestations a principal registers once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id_hash: Hash32,
    pub email_hash: Hash32,
    /// Hash of an organisation or student ID.
    pub secondary_id_hash: Hash32,
    pub registered_at: Timestamp,
}

/// A stored credential digest. Overwritten on update, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub credential_hash: Hash32,
    pub issued_at: Timestamp,
}

/// Key of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialKey {
    pub owner: Principal,
    pub credential_type: CredentialType,
}

impl CredentialKey {
    pub fn new(owner: Principal, credential_type: CredentialType) -> Self {
        Self {
            owner,
            credential_type,
        }
    }
}

/// Key of a consent record: who shares what with whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsentKey {
    pub owner: Principal,
    pub requester: Principal,
    pub credential_type: CredentialType,
}

impl ConsentKey {
    pub fn new(owner: Principal, requester: Principal, credential_type: CredentialType) -> Self {
        Self {
            owner,
            requester,
            credential_type,
        }
    }

    /// The credential this consent covers.
    pub fn credential_key(&self) -> CredentialKey {
        CredentialKey::new(self.owner, self.credential_type)
    }
}

/// A live grant. A revoked grant has no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub expiry: Timestamp,
    pub granted_at: Timestamp,
}

impl ConsentRecord {
    /// Whether the grant is usable at `now`. The expiry instant itself is
    /// already expired.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        now < self.expiry
    }
}

/// Observable state of a consent key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    /// Never granted, or revoked.
    NoConsent,
    /// Granted and not yet expired.
    Active {
        expiry: Timestamp,
        granted_at: Timestamp,
    },
    /// Granted but past its expiry. Behaves like `NoConsent` for access.
    Expired {
        expiry: Timestamp,
        granted_at: Timestamp,
    },
}

impl ConsentStatus {
    /// Classify an optional record at `now`.
    pub fn at(record: Option<&ConsentRecord>, now: Timestamp) -> Self {
        match record {
            None => ConsentStatus::NoConsent,
            Some(r) if r.is_active_at(now) => ConsentStatus::Active {
                expiry: r.expiry,
                granted_at: r.granted_at,
            },
            Some(r) => ConsentStatus::Expired {
                expiry: r.expiry,
                granted_at: r.granted_at,
            },
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ConsentStatus::Active { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_exclusive() {
        let record = ConsentRecord {
            expiry: 1000,
            granted_at: 0,
        };

        assert!(record.is_active_at(0));
        assert!(record.is_active_at(999));
        assert!(!record.is_active_at(1000));
        assert!(!record.is_active_at(1001));
    }

    #[test]
    fn test_status_classification() {
        let record = ConsentRecord {
            expiry: 1000,
            granted_at: 10,
        };

        assert_eq!(ConsentStatus::at(None, 5), ConsentStatus::NoConsent);
        assert_eq!(
            ConsentStatus::at(Some(&record), 500),
            ConsentStatus::Active {
                expiry: 1000,
                granted_at: 10
            }
        );
        assert_eq!(
            ConsentStatus::at(Some(&record), 1000),
            ConsentStatus::Expired {
                expiry: 1000,
                granted_at: 10
            }
        );
    }

    #[test]
    fn test_consent_key_credential_key() {
        let owner = Principal::from_name("alice");
        let requester = Principal::from_name("techcorp");
        let ty = CredentialType::from_label("Bachelor_Diploma");

        let key = ConsentKey::new(owner, requester, ty);
        assert_eq!(key.credential_key(), CredentialKey::new(owner, ty));
    }
}
