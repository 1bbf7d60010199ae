//! In-memory TTL store for challenges and sessions.
//!
//! Each store is an explicitly constructed object with its own lifecycle:
//! create with [`TtlStore::new`], optionally start a background sweep with
//! [`TtlStore::start_sweep`], and stop it via the returned [`SweepHandle`].
//! Nothing here is global, so tests can run isolated store instances.
//!
//! Expired entries are evicted lazily on `get`/`take`; the periodic sweep
//! bounds memory growth from entries that are never read again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Implemented by values that carry their own expiry timestamp.
pub trait HasExpiry {
    /// Epoch milliseconds after which the entry is no longer valid.
    fn expires_at(&self) -> u64;
}

/// Outcome of a [`TtlStore::lookup`].
///
/// Callers that report authentication state collapse `Expired` and
/// `Missing` into one answer; the distinction exists for diagnostics.
#[derive(Debug)]
pub enum Lookup<V> {
    Live(V),
    Expired,
    Missing,
}

/// Thread-safe key-value store with TTL semantics.
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone)]
pub struct TtlStore<V> {
    entries: Arc<Mutex<HashMap<String, V>>>,
}

impl<V: HasExpiry + Clone + Send + 'static> Default for TtlStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HasExpiry + Clone + Send + 'static> TtlStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, V>> {
        // A poisoned lock only means another thread panicked mid-mutation;
        // the map itself is still structurally valid.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get an entry if it exists and has not expired.
    ///
    /// Expired entries are evicted as a side effect and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.lookup(key) {
            Lookup::Live(v) => Some(v),
            _ => None,
        }
    }

    /// Like [`get`](Self::get), but reports whether an absent entry was
    /// missing or expired. Expired entries are still evicted.
    pub fn lookup(&self, key: &str) -> Lookup<V> {
        let mut map = self.lock();
        match map.get(key) {
            Some(v) if v.expires_at() > now_ms() => Lookup::Live(v.clone()),
            Some(_) => {
                map.remove(key);
                Lookup::Expired
            }
            None => Lookup::Missing,
        }
    }

    /// Mutate a live entry in place, returning the updated value.
    ///
    /// Runs under the store lock, so concurrent updates cannot lose
    /// writes. Returns `None` if the entry is missing or expired
    /// (expired entries are evicted).
    pub fn update<F>(&self, key: &str, mutate: F) -> Option<V>
    where
        F: FnOnce(&mut V),
    {
        let mut map = self.lock();
        match map.get_mut(key) {
            Some(v) if v.expires_at() > now_ms() => {
                mutate(v);
                Some(v.clone())
            }
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite an entry unconditionally.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.lock().insert(key.into(), value);
    }

    /// Atomically remove and return an entry, if present and unexpired.
    ///
    /// This is a single critical section, so two concurrent callers can
    /// never both observe the same entry (single-use challenge consumption
    /// depends on this).
    pub fn take(&self, key: &str) -> Option<V> {
        let mut map = self.lock();
        let value = map.remove(key)?;
        if value.expires_at() > now_ms() {
            Some(value)
        } else {
            None
        }
    }

    /// Remove an entry by key. Returns true if it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove all entries matching the predicate. Returns the count removed.
    pub fn delete_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &V) -> bool,
    {
        let mut map = self.lock();
        let keys: Vec<String> = map
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            map.remove(key);
        }
        keys.len()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = now_ms();
        self.lock().values().filter(|v| v.expires_at() > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry. Returns the count removed.
    ///
    /// Snapshots the expired keys first, then deletes, so the critical
    /// section never deletes while iterating the live map.
    pub fn sweep(&self) -> usize {
        let now = now_ms();
        self.delete_where(|_, v| v.expires_at() <= now)
    }

    /// Spawn a background task that sweeps this store at a fixed interval.
    ///
    /// The task runs for the lifetime of the process unless stopped via the
    /// returned handle. Sweeping takes the store lock briefly and never
    /// blocks request handling beyond that.
    pub fn start_sweep(&self, interval: Duration, label: &'static str) -> SweepHandle {
        let store = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so a fresh store isn't
            // swept at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(store = label, removed, "TTL sweep removed expired entries");
                }
            }
        });
        SweepHandle { handle }
    }
}

/// Handle to a running background sweep task.
pub struct SweepHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweep task. Idempotent.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
