//! In-memory response cache.
//!
//! One [`CacheStore`] per backing store. Entries carry the ETag of the
//! response they were built from, so an expired entry can still be
//! revalidated with a conditional request instead of being re-downloaded.
//!
//! # Lock discipline
//!
//! A single [`std::sync::Mutex`] guards the entry map together with the
//! enabled flag and the current TTL. It is held only for the map access
//! itself and never across network I/O: two callers missing on the same key
//! will both go to the remote. Expired entries are not evicted, they stay in
//! memory until the next successful fetch for that key overwrites them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

mod key;
mod policy;

pub use key::CacheKey;
pub use policy::DEFAULT_TTL;

/// One cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    /// ETag of the cached response.
    pub etag: Option<String>,

    /// Cached payload.
    pub data: T,

    /// When the payload was written.
    pub last_checked_at: DateTime<Utc>,

    /// TTL in force when the entry was written.
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is older than its TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        policy::is_expired_at(self.last_checked_at, self.ttl, now)
    }

    /// ETag to send as `if-none-match`, if any.
    pub fn conditional_etag(&self) -> Option<&str> {
        self.etag.as_deref().filter(|e| !e.is_empty())
    }
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    enabled: bool,
    ttl: Duration,
}

/// Concurrency-safe keyed cache with per-entry TTL.
///
/// A disabled store reports every key as missing and ignores writes.
#[derive(Debug)]
pub struct CacheStore<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> CacheStore<T> {
    /// New store, disabled, with [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                enabled: false,
                ttl: DEFAULT_TTL,
            }),
        }
    }

    /// New enabled store with the given TTL.
    pub fn enabled_with_ttl(ttl: Duration) -> Self {
        let store = Self::new();
        store.enable();
        store.set_ttl(ttl);
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panic while holding the guard cannot leave the map half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn enable(&self) {
        self.lock().enabled = true;
    }

    pub fn disable(&self) {
        self.lock().enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// TTL for entries written from now on. Existing entries keep theirs.
    pub fn set_ttl(&self, ttl: Duration) {
        self.lock().ttl = ttl;
    }

    pub fn ttl(&self) -> Duration {
        self.lock().ttl
    }

    /// Entry for `key`, expired or not. `None` when disabled.
    pub fn read(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let inner = self.lock();
        if !inner.enabled {
            return None;
        }
        inner.entries.get(key).cloned()
    }

    /// Insert or replace the entry for `key` with the current TTL.
    pub fn write(&self, key: CacheKey, etag: Option<String>, checked_at: DateTime<Utc>, data: T) {
        let mut inner = self.lock();
        if !inner.enabled {
            return;
        }

        let ttl = inner.ttl;
        debug!(cache_key = %key, etag = ?etag, ttl_secs = ttl.as_secs(), "updating cache entry");
        inner.entries.insert(
            key,
            CacheEntry {
                etag,
                data,
                last_checked_at: checked_at,
                ttl,
            },
        );
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stores keyed by backing-store identity.
///
/// Owned by whoever instantiates clients, so that every client created for
/// the same store shares one cache and distinct stores never share keys.
#[derive(Debug)]
pub struct CacheRegistry<T> {
    stores: Mutex<HashMap<String, Arc<CacheStore<T>>>>,
}

impl<T: Clone> CacheRegistry<T> {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Store for `store_id`, created (disabled) on first use.
    pub fn get_or_create(&self, store_id: &str) -> Arc<CacheStore<T>> {
        let mut stores = self
            .stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        stores
            .entry(store_id.to_string())
            .or_insert_with(|| {
                debug!(store_id, "creating response cache");
                Arc::new(CacheStore::new())
            })
            .clone()
    }

    pub fn get(&self, store_id: &str) -> Option<Arc<CacheStore<T>>> {
        self.stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(store_id)
            .cloned()
    }
}

impl<T: Clone> Default for CacheRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
