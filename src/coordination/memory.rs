//! # In-process coordination store.
//!
//! [`MemoryStore`] implements [`Coordinator`] over a `BTreeMap` with a single
//! monotonically increasing modification index, TTL leases measured on
//! [`tokio::time::Instant`] (so paused-clock tests can expire them), and
//! watches woken through a [`tokio::sync::watch`] channel.
//!
//! It can be switched offline with [`MemoryStore::set_available`] to exercise
//! retry paths: every operation (and every pending watch) then fails with
//! [`CoordinationError::Unavailable`].
//!
//! ## Rules
//! - Every write, delete and expiry bumps the index and wakes watchers.
//! - `refresh` extends a lease without bumping the index.
//! - Expired keys are purged lazily on the next operation or watch deadline.
//! - Deletion tombstones are bounded: past [`TOMBSTONE_LIMIT`] the oldest half
//!   is compacted, and a watch on a missing key older than the compaction
//!   index fires at once.
//! - A TTL too large to represent as an [`Instant`] means no expiry.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::coordination::coordinator::{Coordinator, Guard, Node, Watch};
use crate::error::CoordinationError;

/// Most deletion tombstones kept before compaction.
pub(crate) const TOMBSTONE_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    created_index: u64,
    modified_index: u64,
    expires_at: Option<Instant>,
}

#[derive(Debug)]
struct Inner {
    index: u64,
    entries: BTreeMap<String, Entry>,
    /// Index at which a key was last deleted or expired.
    removed: HashMap<String, u64>,
    /// Highest tombstone index dropped by compaction.
    compacted: u64,
    available: bool,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    /// Drops expired entries; returns `true` if anything expired.
    fn purge(&mut self, now: Instant) -> bool {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
            let index = self.bump();
            self.tombstone(key, index);
        }
        !expired.is_empty()
    }

    fn tombstone(&mut self, key: &str, index: u64) {
        self.removed.insert(key.to_string(), index);
        if self.removed.len() <= TOMBSTONE_LIMIT {
            return;
        }
        let mut indices: Vec<u64> = self.removed.values().copied().collect();
        indices.sort_unstable();
        let floor = indices[indices.len() / 2];
        self.removed.retain(|_, i| *i > floor);
        self.compacted = self.compacted.max(floor);
    }

    fn ensure_available(&self) -> Result<(), CoordinationError> {
        if self.available {
            Ok(())
        } else {
            Err(CoordinationError::Unavailable {
                reason: "store offline".to_string(),
            })
        }
    }

    fn check(&self, key: &str, guard: &Guard) -> Result<(), CoordinationError> {
        let not_found = || CoordinationError::KeyNotFound {
            key: key.to_string(),
        };
        match (guard, self.entries.get(key)) {
            (Guard::None, _) => Ok(()),
            (Guard::MustExist | Guard::AtIndex(_) | Guard::Equals(_), None) => Err(not_found()),
            (Guard::MustNotExist, Some(_)) => Err(CoordinationError::NodeExists {
                key: key.to_string(),
            }),
            (Guard::AtIndex(n), Some(e)) if e.modified_index != *n => {
                Err(CoordinationError::CompareFailed {
                    key: key.to_string(),
                    reason: format!("[{n} != {}]", e.modified_index),
                })
            }
            (Guard::Equals(v), Some(e)) if e.value != *v => Err(CoordinationError::CompareFailed {
                key: key.to_string(),
                reason: format!("[{v} != {}]", e.value),
            }),
            _ => Ok(()),
        }
    }

    fn read(&self, key: &str, now: Instant) -> Result<Node, CoordinationError> {
        self.entries
            .get(key)
            .map(|e| snapshot(key, e, now))
            .ok_or_else(|| CoordinationError::KeyNotFound {
                key: key.to_string(),
            })
    }

    fn changed_since(&self, key: &str, index: u64) -> bool {
        match (self.entries.get(key), self.removed.get(key)) {
            (Some(e), _) => e.modified_index > index,
            (None, Some(&removed)) => removed > index,
            (None, None) => index < self.compacted,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().filter_map(|e| e.expires_at).min()
    }
}

fn snapshot(key: &str, e: &Entry, now: Instant) -> Node {
    Node {
        key: key.to_string(),
        value: e.value.clone(),
        created_index: e.created_index,
        modified_index: e.modified_index,
        ttl: e.expires_at.map(|at| at.saturating_duration_since(now)),
    }
}

/// In-memory [`Coordinator`].
pub struct MemoryStore {
    inner: Mutex<Inner>,
    changes: watch::Sender<u64>,
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        let (changes, _rx) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner {
                index: 0,
                entries: BTreeMap::new(),
                removed: HashMap::new(),
                compacted: 0,
                available: true,
            }),
            changes,
        }
    }

    /// Switches the store on or off; wakes every pending watch.
    pub fn set_available(&self, available: bool) {
        let index = {
            let mut inner = self.inner.lock();
            inner.available = available;
            inner.index
        };
        self.changes.send_replace(index);
    }

    /// Current modification index.
    pub fn index(&self) -> u64 {
        self.inner.lock().index
    }

    /// Keys currently stored under `prefix` (expired keys excluded), sorted.
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let mut inner = self.inner.lock();
        if inner.purge(Instant::now()) {
            self.changes.send_replace(inner.index);
        }
        inner
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Locks the store, purges expired keys and fails if offline.
    fn open(&self) -> Result<(parking_lot::MutexGuard<'_, Inner>, Instant), CoordinationError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        if inner.purge(now) {
            self.changes.send_replace(inner.index);
        }
        inner.ensure_available()?;
        Ok((inner, now))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Coordinator for MemoryStore {
    async fn get(&self, key: &str, watch: Watch) -> Result<Node, CoordinationError> {
        let mut rx = self.changes.subscribe();
        loop {
            let deadline = {
                let (inner, now) = self.open()?;
                match watch {
                    Watch::No => return inner.read(key, now),
                    Watch::After(index) if inner.changed_since(key, index) => {
                        return inner.read(key, now);
                    }
                    Watch::After(_) => inner.next_deadline(),
                }
            };

            let woke = match deadline {
                Some(at) => tokio::select! {
                    r = rx.changed() => r.is_ok(),
                    _ = tokio::time::sleep_until(at) => true,
                },
                None => rx.changed().await.is_ok(),
            };
            if !woke {
                return Err(CoordinationError::Unavailable {
                    reason: "store dropped".to_string(),
                });
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        guard: Guard,
        ttl: Option<Duration>,
    ) -> Result<Node, CoordinationError> {
        let (mut inner, now) = self.open()?;
        inner.check(key, &guard)?;

        let index = inner.bump();
        let created_index = inner
            .entries
            .get(key)
            .map(|e| e.created_index)
            .unwrap_or(index);
        let entry = Entry {
            value: value.to_string(),
            created_index,
            modified_index: index,
            expires_at: ttl.and_then(|t| now.checked_add(t)),
        };
        let node = snapshot(key, &entry, now);
        inner.removed.remove(key);
        inner.entries.insert(key.to_string(), entry);
        self.changes.send_replace(index);
        Ok(node)
    }

    async fn delete(&self, key: &str, guard: Guard) -> Result<Node, CoordinationError> {
        let (mut inner, now) = self.open()?;
        let prev = inner.read(key, now)?;
        inner.check(key, &guard)?;

        inner.entries.remove(key);
        let index = inner.bump();
        inner.tombstone(key, index);
        self.changes.send_replace(index);
        Ok(prev)
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> Result<Node, CoordinationError> {
        let (mut inner, now) = self.open()?;
        let entry = inner
            .entries
            .get_mut(key)
            .ok_or_else(|| CoordinationError::KeyNotFound {
                key: key.to_string(),
            })?;
        entry.expires_at = now.checked_add(ttl);
        Ok(snapshot(key, entry, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_guards() {
        let store = MemoryStore::new();

        let created = store.put("/k", "a", Guard::MustNotExist, None).await.unwrap();
        assert_eq!(created.created_index, created.modified_index);
        assert!(matches!(
            store.put("/k", "b", Guard::MustNotExist, None).await,
            Err(CoordinationError::NodeExists { .. })
        ));
        assert!(matches!(
            store.put("/missing", "b", Guard::MustExist, None).await,
            Err(CoordinationError::KeyNotFound { .. })
        ));
        assert!(matches!(
            store.put("/k", "b", Guard::AtIndex(created.modified_index + 7), None).await,
            Err(CoordinationError::CompareFailed { .. })
        ));
        assert!(matches!(
            store.put("/k", "b", Guard::Equals("zzz".into()), None).await,
            Err(CoordinationError::CompareFailed { .. })
        ));

        let updated = store
            .put("/k", "b", Guard::AtIndex(created.modified_index), None)
            .await
            .unwrap();
        assert_eq!(updated.value, "b");
        assert_eq!(updated.created_index, created.created_index);
        assert!(updated.modified_index > created.modified_index);

        assert!(store.delete("/k", Guard::Equals("a".into())).await.is_err());
        let gone = store.delete("/k", Guard::Equals("b".into())).await.unwrap();
        assert_eq!(gone.value, "b");
        assert!(store.get("/k", Watch::No).await.unwrap_err().is_key_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_and_refresh() {
        let store = MemoryStore::new();
        store
            .put("/lease", "me", Guard::None, Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        let refreshed = store.refresh("/lease", Duration::from_secs(10)).await.unwrap();
        assert_eq!(refreshed.ttl, Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.get("/lease", Watch::No).await.is_ok());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(store.get("/lease", Watch::No).await.unwrap_err().is_key_not_found());
        assert!(store
            .refresh("/lease", Duration::from_secs(10))
            .await
            .unwrap_err()
            .is_key_not_found());
    }

    #[tokio::test]
    async fn test_watch_wakes_on_write() {
        let store = Arc::new(MemoryStore::new());
        let first = store.put("/w", "1", Guard::None, None).await.unwrap();

        let watcher = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get("/w", Watch::After(first.modified_index)).await })
        };
        tokio::task::yield_now().await;
        store.put("/w", "2", Guard::None, None).await.unwrap();

        let seen = watcher.await.unwrap().unwrap();
        assert_eq!(seen.value, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_wakes_on_expiry() {
        let store = MemoryStore::new();
        let node = store
            .put("/w", "1", Guard::None, Some(Duration::from_secs(3)))
            .await
            .unwrap();

        let err = store
            .get("/w", Watch::After(node.modified_index))
            .await
            .unwrap_err();
        assert!(err.is_key_not_found());
        assert!(store.index() > node.modified_index);
    }

    #[tokio::test]
    async fn test_offline_store_fails_and_wakes_watchers() {
        let store = Arc::new(MemoryStore::new());
        let node = store.put("/w", "1", Guard::None, None).await.unwrap();

        let watcher = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get("/w", Watch::After(node.modified_index)).await })
        };
        tokio::task::yield_now().await;
        store.set_available(false);

        assert!(watcher.await.unwrap().unwrap_err().is_retryable());
        assert!(store
            .put("/x", "1", Guard::None, None)
            .await
            .unwrap_err()
            .is_retryable());

        store.set_available(true);
        assert!(store.get("/w", Watch::No).await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_by_prefix() {
        let store = MemoryStore::new();
        for k in ["/c/nodes/b", "/c/nodes/a", "/other"] {
            store.put(k, "v", Guard::None, None).await.unwrap();
        }
        assert_eq!(store.keys("/c/nodes/"), vec!["/c/nodes/a", "/c/nodes/b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_ttl_never_expires() {
        let store = MemoryStore::new();
        let node = store
            .put("/forever", "v", Guard::None, Some(Duration::MAX))
            .await
            .unwrap();
        assert_eq!(node.ttl, None);

        store.refresh("/forever", Duration::MAX).await.unwrap();
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(store.get("/forever", Watch::No).await.is_ok());
    }

    #[tokio::test]
    async fn test_tombstones_are_compacted() {
        let store = MemoryStore::new();
        let first = store.put("/gone/0", "v", Guard::None, None).await.unwrap();
        for i in 0..(TOMBSTONE_LIMIT * 2) {
            let key = format!("/gone/{i}");
            store.put(&key, "v", Guard::None, None).await.unwrap();
            store.delete(&key, Guard::None).await.unwrap();
        }
        assert!(store.inner.lock().removed.len() <= TOMBSTONE_LIMIT);

        // Its tombstone was compacted away, so an old watch answers at once.
        let err = store
            .get("/gone/0", Watch::After(first.modified_index))
            .await
            .unwrap_err();
        assert!(err.is_key_not_found());

        // Re-creating a key clears its tombstone.
        let last = format!("/gone/{}", TOMBSTONE_LIMIT * 2 - 1);
        store.put(&last, "back", Guard::None, None).await.unwrap();
        assert!(!store.inner.lock().removed.contains_key(&last));
    }
}
