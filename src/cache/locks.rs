//! Per-key mutual exclusion for cache misses
//!
//! `KeyedLocks` hands out one async mutex per snapshot key. Requests for the same
//! key queue behind each other while requests for distinct keys never touch the
//! same lock. Entries are created on first use and dropped again once nobody
//! holds or waits on them, so the map only ever contains keys with work in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::SnapshotKey;

/// Map from snapshot key to its exclusive-access scope
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<SnapshotKey, Arc<Mutex<()>>>,
}

/// Exclusive access to one key, released on drop
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: SnapshotKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the caller is the only holder for `key`
    pub async fn lock(&self, key: &SnapshotKey) -> KeyGuard<'_> {
        // Built before waiting so a waiter dropped mid-wait still runs `release`.
        // The pending acquire (and its Arc) is dropped before this guard.
        let mut key_guard = KeyGuard {
            owner: self,
            key: key.clone(),
            guard: None,
        };
        // The entry API clones the Arc under the shard lock, so the cleanup in
        // `release` can never remove an entry somebody is about to wait on.
        let lock = Arc::clone(&self.locks.entry(key.clone()).or_default());
        key_guard.guard = Some(lock.lock_owned().await);
        key_guard
    }

    /// Number of keys with a holder or waiter
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    fn release(&self, key: &SnapshotKey) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Drop the guard (and its Arc) first so only the map's reference can remain
        self.guard.take();
        self.owner.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(airport: &str) -> SnapshotKey {
        SnapshotKey::arrivals(airport, "2024-05-01").unwrap()
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = KeyedLocks::new();

        {
            let _guard = locks.lock(&key("ARN")).await;
            assert_eq!(locks.in_flight(), 1);
        }

        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_entry_removed_when_pending_waiter_is_dropped() {
        let locks = KeyedLocks::new();
        let holder = locks.lock(&key("ARN")).await;

        let waiter_key = key("ARN");
        let mut waiter = Box::pin(locks.lock(&waiter_key));
        assert!(futures::poll!(waiter.as_mut()).is_pending());

        // Handed over to the waiter, which is then cancelled before it runs
        drop(holder);
        assert_eq!(locks.in_flight(), 1);
        drop(waiter);

        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_entry_removed_when_timed_out_waiter_gives_up() {
        let locks = KeyedLocks::new();

        {
            let _holder = locks.lock(&key("ARN")).await;
            let waited =
                tokio::time::timeout(Duration::from_millis(10), locks.lock(&key("ARN"))).await;
            assert!(waited.is_err(), "Waiter should time out while the key is held");
        }

        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                tokio::spawn(async move {
                    let _guard = locks.lock(&key("ARN")).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            task.expect("Task should not panic");
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block_each_other() {
        let locks = KeyedLocks::new();

        let _arn = locks.lock(&key("ARN")).await;
        let got = tokio::time::timeout(Duration::from_secs(1), locks.lock(&key("GOT"))).await;

        assert!(got.is_ok(), "Lock on a different key should not wait");
        assert_eq!(locks.in_flight(), 2);
    }
}
