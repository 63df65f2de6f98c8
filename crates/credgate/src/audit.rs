//! The audit log: an append-only, hash-chained record of access attempts.

use std::sync::Arc;

use credgate_consent::EventBus;
use credgate_core::{AccessAttempt, AccessLogEntry, Event, Hash32, Principal};
use credgate_store::Store;
use serde::{Deserialize, Serialize};

use crate::error::{MediatorError, Result};

/// Entries fetched per round trip while verifying the chain.
const VERIFY_PAGE: u64 = 512;

/// Result of walking the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStatus {
    /// Every entry checks out.
    Intact { entries: u64 },
    /// The entry at `index` was edited, reordered, or its predecessor is gone.
    BrokenAt { index: u64 },
}

impl ChainStatus {
    pub fn is_intact(&self) -> bool {
        matches!(self, ChainStatus::Intact { .. })
    }
}

/// Read access to the log, and appends for the mediator.
pub struct AuditLog<S: Store> {
    store: Arc<S>,
    events: EventBus,
}

impl<S: Store> Clone for AuditLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            events: self.events.clone(),
        }
    }
}

impl<S: Store> AuditLog<S> {
    pub(crate) fn new(store: Arc<S>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Append and commit one attempt.
    pub(crate) async fn record(&self, attempt: AccessAttempt) -> Result<AccessLogEntry> {
        let entry = self.store.append_access(attempt).await?;

        if entry.granted {
            tracing::info!(
                index = entry.index,
                owner = %entry.owner,
                requester = %entry.requester,
                "access granted"
            );
        } else {
            tracing::warn!(
                index = entry.index,
                owner = %entry.owner,
                requester = %entry.requester,
                reason = %entry.reason,
                "access denied"
            );
        }

        self.events.emit(Event::AccessLogged {
            index: entry.index,
            owner: entry.owner,
            requester: entry.requester,
            credential_type: entry.credential_type,
            granted: entry.granted,
            reason: entry.reason.clone(),
        });

        Ok(entry)
    }

    /// Every attempt against `owner`'s credentials, oldest first.
    pub async fn logs_for_owner(&self, owner: &Principal) -> Result<Vec<AccessLogEntry>> {
        let entries = self.store.accesses_by_owner(owner).await?;
        tracing::debug!(owner = %owner, count = entries.len(), "owner logs read");
        Ok(entries)
    }

    /// Every attempt made by `requester`, oldest first.
    pub async fn logs_for_requester(&self, requester: &Principal) -> Result<Vec<AccessLogEntry>> {
        let entries = self.store.accesses_by_requester(requester).await?;
        tracing::debug!(requester = %requester, count = entries.len(), "requester logs read");
        Ok(entries)
    }

    /// The entry at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when `index >= log_count()`.
    pub async fn log_by_index(&self, index: u64) -> Result<AccessLogEntry> {
        match self.store.access_at(index).await? {
            Some(entry) => Ok(entry),
            None => Err(MediatorError::IndexOutOfRange {
                index,
                len: self.store.access_count().await?,
            }),
        }
    }

    pub async fn log_count(&self) -> Result<u64> {
        Ok(self.store.access_count().await?)
    }

    /// Recompute the whole chain from index 0.
    pub async fn verify_chain(&self) -> Result<ChainStatus> {
        let len = self.store.access_count().await?;
        let mut prev = Hash32::ZERO;
        let mut next = 0u64;

        while next < len {
            let end = next.saturating_add(VERIFY_PAGE).min(len);
            let page = self.store.access_range(next, end).await?;
            if page.len() as u64 != end - next {
                return Ok(self.broken(next + page.len() as u64));
            }

            for entry in &page {
                if !entry.follows(next, &prev) {
                    return Ok(self.broken(next));
                }
                prev = entry.digest;
                next += 1;
            }
        }

        tracing::debug!(entries = len, "audit chain verified");
        Ok(ChainStatus::Intact { entries: len })
    }

    fn broken(&self, index: u64) -> ChainStatus {
        tracing::error!(index, "audit chain broken");
        ChainStatus::BrokenAt { index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgate_core::{CredentialType, REASON_CONSENT_INVALID};
    use credgate_store::MemoryStore;

    fn log() -> AuditLog<MemoryStore> {
        AuditLog::new(Arc::new(MemoryStore::new()), EventBus::default())
    }

    fn attempt(owner: &str, requester: &str, granted: bool) -> AccessAttempt {
        let owner = Principal::from_name(owner);
        let requester = Principal::from_name(requester);
        let ty = CredentialType::from_label("Bachelor_Diploma");
        if granted {
            AccessAttempt::granted(owner, requester, ty, Hash32::digest(b"doc"), 100)
        } else {
            AccessAttempt::denied(owner, requester, ty, 100, REASON_CONSENT_INVALID)
        }
    }

    #[tokio::test]
    async fn test_record_assigns_consecutive_indices() {
        let log = log();
        for i in 0..3 {
            let entry = log.record(attempt("alice", "techcorp", i != 1)).await.unwrap();
            assert_eq!(entry.index, i);
        }
        assert_eq!(log.log_count().await.unwrap(), 3);
        assert!(!log.log_by_index(1).await.unwrap().granted);
    }

    #[tokio::test]
    async fn test_log_by_index_out_of_range() {
        let log = log();
        log.record(attempt("alice", "techcorp", true)).await.unwrap();

        let err = log.log_by_index(1).await.unwrap_err();
        assert!(matches!(err, MediatorError::IndexOutOfRange { index: 1, len: 1 }));
    }

    #[tokio::test]
    async fn test_indices_filter_by_party() {
        let log = log();
        log.record(attempt("alice", "techcorp", true)).await.unwrap();
        log.record(attempt("bob", "techcorp", false)).await.unwrap();
        log.record(attempt("alice", "uni", false)).await.unwrap();

        let alice: Vec<u64> = log
            .logs_for_owner(&Principal::from_name("alice"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.index)
            .collect();
        assert_eq!(alice, vec![0, 2]);

        let techcorp: Vec<u64> = log
            .logs_for_requester(&Principal::from_name("techcorp"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.index)
            .collect();
        assert_eq!(techcorp, vec![0, 1]);

        assert!(log
            .logs_for_owner(&Principal::from_name("nobody"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_verify_chain_across_pages() {
        let log = log();
        assert_eq!(
            log.verify_chain().await.unwrap(),
            ChainStatus::Intact { entries: 0 }
        );

        for i in 0..(VERIFY_PAGE + 3) {
            log.record(attempt("alice", "techcorp", i % 3 != 0)).await.unwrap();
        }
        assert_eq!(
            log.verify_chain().await.unwrap(),
            ChainStatus::Intact {
                entries: VERIFY_PAGE + 3
            }
        );
    }

    #[tokio::test]
    async fn test_record_emits_event() {
        let log = log();
        let mut rx = log.events.subscribe();
        log.record(attempt("alice", "techcorp", false)).await.unwrap();

        match rx.recv().await.unwrap() {
            Event::AccessLogged {
                index,
                granted,
                reason,
                ..
            } => {
                assert_eq!(index, 0);
                assert!(!granted);
                assert_eq!(reason, REASON_CONSENT_INVALID);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
