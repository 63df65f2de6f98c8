//! Mediator configuration.

use std::time::Duration;

use credgate_consent::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};

/// Configuration for the [`AccessMediator`](crate::AccessMediator).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use credgate::MediatorConfig;
///
/// let config = MediatorConfig::from_json(r#"{ "reward_amount": 25 }"#).unwrap();
/// assert_eq!(config.reward_amount, 25);
/// assert_eq!(config.mint_timeout_ms, 5_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Credits minted to an owner for each successful grant.
    pub reward_amount: u64,
    /// How long a single mint may take before the reward is queued.
    pub mint_timeout_ms: u64,
    /// Events buffered per subscriber before it lags.
    pub event_capacity: usize,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            reward_amount: 10,
            mint_timeout_ms: 5_000,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl MediatorConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn mint_timeout(&self) -> Duration {
        Duration::from_millis(self.mint_timeout_ms)
    }
}
