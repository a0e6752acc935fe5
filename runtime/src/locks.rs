//! Arena of per-key async locks.
//!
//! Commands for the same key (a booking id, an artist id) run one at a time;
//! commands for different keys never contend. Slots are created on first use
//! and dropped again once nobody holds or waits for them, so the arena only
//! ever contains keys with work in flight.
//!
//! # Example
//!
//! ```rust
//! use booking_engine_runtime::locks::KeyedLocks;
//!
//! # async fn example() {
//! let locks = KeyedLocks::<u32>::new();
//! let guard = locks.lock(&7).await;
//! // ... mutate the record for key 7 ...
//! drop(guard);
//! assert!(locks.is_empty());
//! # }
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    /// Holders plus queued waiters.
    users: usize,
}

type Slots<K> = Arc<Mutex<HashMap<K, Slot>>>;

/// Per-key mutual exclusion.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Slots<K>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait for exclusive access to `key`.
    ///
    /// The returned guard releases the key on drop. Dropping the future
    /// while it is still queued gives up the place in line.
    pub async fn lock(&self, key: &K) -> KeyedGuard<K> {
        let (mutex, lease) = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
                mutex: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            (
                Arc::clone(&slot.mutex),
                Lease {
                    key: key.clone(),
                    slots: Arc::clone(&self.slots),
                },
            )
        };

        let guard = mutex.lock_owned().await;

        KeyedGuard { guard, lease }
    }

    /// Number of keys currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is currently held or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

/// One registered user of a slot. The last lease to go removes the slot.
struct Lease<K>
where
    K: Eq + Hash,
{
    key: K,
    slots: Slots<K>,
}

impl<K> Drop for Lease<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Exclusive access to one key of a [`KeyedLocks`] arena.
pub struct KeyedGuard<K>
where
    K: Eq + Hash,
{
    // Declared before `lease`: the mutex is released before the slot count drops.
    guard: OwnedMutexGuard<()>,
    lease: Lease<K>,
}

impl<K> KeyedGuard<K>
where
    K: Eq + Hash,
{
    /// The key this guard holds.
    pub const fn key(&self) -> &K {
        &self.lease.key
    }
}

impl<K> std::fmt::Debug for KeyedGuard<K>
where
    K: Eq + Hash + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedGuard")
            .field("key", &self.lease.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyedLocks::<&'static str>::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(&"booking-1").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            let _ = task.await;
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = KeyedLocks::<u32>::new();
        let first = locks.lock(&1).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(&2)).await;
        assert!(second.is_ok(), "key 2 must not wait for key 1");
        assert_eq!(locks.len(), 2);

        drop(first);
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_slot_survives_while_waiter_is_queued() {
        let locks = KeyedLocks::<u32>::new();
        let held = locks.lock(&9).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let guard = locks.lock(&9).await;
                *guard.key()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(held);
        assert_eq!(waiter.await.ok(), Some(9));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_leak_slot() {
        let locks = KeyedLocks::<u32>::new();
        let held = locks.lock(&4).await;

        let gave_up = tokio::time::timeout(Duration::from_millis(10), locks.lock(&4)).await;
        assert!(gave_up.is_err(), "key 4 is still held");
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_waiter_after_release_does_not_leak_slot() {
        let locks = KeyedLocks::<u32>::new();
        let held = locks.lock(&5).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&5).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(held);
        waiter.abort();
        let _ = waiter.await;

        assert!(locks.is_empty());
    }
}
