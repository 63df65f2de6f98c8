//! Per-key async locks.
//!
//! Mutations that read, validate, and then write a key hold that key's lock
//! for the whole sequence. Different keys never contend.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;

/// One key's lock and the number of callers holding or waiting on it.
struct Slot {
    mutex: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

/// A set of lazily created locks, one per key.
///
/// Slots are dropped again once nobody holds or waits on them, so the map
/// only grows with the number of keys in flight. A waiter that gives up
/// (its `lock` future is dropped) releases its claim like a holder does.
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let claim = self.claim(key);
        let guard = Arc::clone(&claim.mutex).lock_owned().await;
        KeyGuard {
            _guard: guard,
            _claim: claim,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn in_flight(&self) -> usize {
        self.slots().len()
    }

    fn claim(&self, key: K) -> Claim<'_, K> {
        let mut slots = self.slots();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
            mutex: Arc::default(),
            users: 0,
        });
        slot.users += 1;

        Claim {
            locks: self,
            mutex: Arc::clone(&slot.mutex),
            key,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        // The map holds no invariants a panicking holder could break
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A counted interest in one key's slot, held from the moment `lock` is
/// called until the guard is dropped or the wait is abandoned.
struct Claim<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyedLocks<K>,
    mutex: Arc<tokio::sync::Mutex<()>>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for Claim<'_, K> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Exclusive access to one key. Released on drop.
pub struct KeyGuard<'a, K: Eq + Hash + Clone> {
    // Field order matters: unlock first, then give up the claim
    _guard: OwnedMutexGuard<()>,
    _claim: Claim<'a, K>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let guard = locks.lock(1).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
                order.lock().unwrap().push("waiter");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().unwrap().push("holder");
        drop(guard);

        waiter.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["holder", "waiter"]);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<u32>::new();
        let _a = locks.lock(1).await;

        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(2)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_slots_are_pruned() {
        let locks = KeyedLocks::<u32>::new();
        {
            let _a = locks.lock(1).await;
            let _b = locks.lock(2).await;
            assert_eq!(locks.in_flight(), 2);
        }
        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_is_pruned() {
        let locks = KeyedLocks::<u32>::new();
        let holder = locks.lock(1).await;

        let waited = tokio::time::timeout(Duration::from_millis(20), locks.lock(1)).await;
        assert!(waited.is_err());
        assert_eq!(locks.in_flight(), 1);

        drop(holder);
        assert_eq!(locks.in_flight(), 0);

        let _again = locks.lock(1).await;
        assert_eq!(locks.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_waiter_keeps_slot_until_it_is_done() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let holder = locks.lock(7).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(7).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(holder);
        waiter.await.unwrap();
        assert_eq!(locks.in_flight(), 0);
    }
}
