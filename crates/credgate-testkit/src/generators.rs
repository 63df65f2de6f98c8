//! Proptest generators for property-based testing.

use proptest::prelude::*;

use credgate_core::{CredentialType, Hash32, Principal, MAX_DURATION, MIN_DURATION};

/// Generate a random principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    any::<[u8; 32]>().prop_map(Principal::from_bytes)
}

/// Two different principals.
pub fn distinct_principals() -> impl Strategy<Value = (Principal, Principal)> {
    (principal(), principal()).prop_filter("principals must differ", |(a, b)| a != b)
}

/// Generate any hash, the zero hash included.
pub fn hash32() -> impl Strategy<Value = Hash32> {
    any::<[u8; 32]>().prop_map(Hash32)
}

/// Generate a hash accepted wherever a hash argument is required.
pub fn nonzero_hash() -> impl Strategy<Value = Hash32> {
    hash32().prop_filter("zero hash is rejected", |h| !h.is_zero())
}

/// Generate a credential label.
pub fn label() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z_]{2,23}".prop_map(String::from)
}

pub fn credential_type() -> impl Strategy<Value = CredentialType> {
    label().prop_map(|l| CredentialType::from_label(&l))
}

/// A consent duration inside the allowed window, bounds included.
pub fn valid_duration() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(MIN_DURATION),
        Just(MAX_DURATION),
        MIN_DURATION..=MAX_DURATION,
    ]
}

/// A positive consent duration outside the allowed window.
pub fn invalid_duration() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(MIN_DURATION - 1),
        Just(MAX_DURATION + 1),
        1u64..MIN_DURATION,
        (MAX_DURATION + 1)..=(MAX_DURATION * 4),
    ]
}

/// Parameters for one grant between two distinct parties.
#[derive(Debug, Clone)]
pub struct GrantParams {
    pub owner: String,
    pub requester: String,
    pub label: String,
    pub duration: u64,
}

impl Arbitrary for GrantParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        ("[a-z]{3,12}", "[a-z]{3,12}", label(), valid_duration())
            .prop_filter("owner and requester must differ", |(o, r, _, _)| o != r)
            .prop_map(|(owner, requester, label, duration)| GrantParams {
                owner,
                requester,
                label,
                duration,
            })
            .boxed()
    }
}
