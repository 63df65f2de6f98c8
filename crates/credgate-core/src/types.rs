//! Strong type definitions for credgate.
//!
//! All identifiers are newtypes to prevent misuse at compile time: a
//! credential type can't be passed where a principal is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Hash32;

/// Unix time in seconds.
pub type Timestamp = u64;

/// An opaque, globally unique actor identifier (e.g. a public key).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(pub [u8; 32]);

impl Principal {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a principal from a human-readable name.
    ///
    /// Handy for fixtures and local tooling. Production principals are keys.
    pub fn from_name(name: &str) -> Self {
        Self(Hash32::digest(name.as_bytes()).0)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Hash32::from_hex(s).map(|h| Self(h.0))
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl From<[u8; 32]> for Principal {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Principal {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// The kind of credential a record holds, e.g. `Bachelor_Diploma`.
///
/// Stored as the hash of its label so types are fixed-width and opaque.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialType(pub Hash32);

impl CredentialType {
    /// Hash a human-readable label into a credential type.
    pub fn from_label(label: &str) -> Self {
        Self(Hash32::digest(label.as_bytes()))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Hash32(bytes))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    /// Get the underlying hash.
    pub const fn hash(&self) -> Hash32 {
        self.0
    }
}

impl fmt::Debug for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialType({})", &self.0.to_hex()[..16])
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_hex()[..16])
    }
}

impl From<Hash32> for CredentialType {
    fn from(hash: Hash32) -> Self {
        Self(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_from_name_is_stable() {
        assert_eq!(Principal::from_name("alice"), Principal::from_name("alice"));
        assert_ne!(Principal::from_name("alice"), Principal::from_name("bob"));
    }

    #[test]
    fn test_principal_hex_roundtrip() {
        let p = Principal::from_bytes([0x11; 32]);
        assert_eq!(Principal::from_hex(&p.to_hex()).unwrap(), p);
    }

    #[test]
    fn test_principal_display() {
        let p = Principal::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", p), "abababababababab");
    }

    #[test]
    fn test_credential_type_from_label() {
        let diploma = CredentialType::from_label("Bachelor_Diploma");
        assert_eq!(diploma.hash(), Hash32::digest(b"Bachelor_Diploma"));
        assert_ne!(diploma, CredentialType::from_label("Master_Diploma"));
    }
}
