// SPDX-License-Identifier: MIT OR Apache-2.0
//! LRU cache with TTL and file-content-hash invalidation.
//!
//! Expensive parses and compressions are memoized under caller-supplied
//! string keys. An entry is served only while (a) its TTL has not elapsed
//! and (b) every file tracked at insertion time still hashes to the same
//! SHA-256. Stale entries are evicted lazily on read — there is no
//! background reaper.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Hex-encoded SHA-256 of a file's raw bytes.
///
/// Unreadable files hash to the empty string, which can never equal a real
/// digest, so a tracked file that disappears invalidates its entries.
#[must_use]
pub fn hash_file(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            format!("{:x}", hasher.finalize())
        }
        Err(_) => String::new(),
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
    file_hashes: Vec<(PathBuf, String)>,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) < self.ttl
    }

    fn files_unchanged(&self) -> bool {
        self.file_hashes
            .iter()
            .all(|(path, hash)| hash_file(path) == *hash)
    }
}

/// Running counters exposed by [`SmartCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Served entries.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries evicted because TTL elapsed or a tracked file changed.
    pub invalidations: u64,
}

struct Inner<V> {
    entries: LruCache<String, Entry<V>>,
    stats: CacheStats,
}

/// Bounded, internally synchronized memoization cache.
///
/// Callers never need to lock: every operation takes `&self`.
pub struct SmartCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> SmartCache<V> {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Look up a key, validating TTL and tracked file hashes.
    ///
    /// A stale or invalidated entry is evicted and reported as a miss.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        let inner = &mut *guard;
        let now = Instant::now();

        // `entries.get` also refreshes LRU recency on a hit.
        let usable = inner
            .entries
            .get(key)
            .map(|entry| entry.is_fresh(now) && entry.files_unchanged());

        match usable {
            None => {
                inner.stats.misses += 1;
                None
            }
            Some(false) => {
                debug!(target: "cxo.cache", key, "entry invalidated");
                inner.entries.pop(key);
                inner.stats.invalidations += 1;
                inner.stats.misses += 1;
                None
            }
            Some(true) => {
                inner.stats.hits += 1;
                Some(inner.entries.peek(key).expect("entry present").value.clone())
            }
        }
    }

    /// Insert a value, snapshotting the hash of every tracked path now.
    pub fn put(&self, key: impl Into<String>, value: V, tracked_paths: &[PathBuf], ttl: Duration) {
        let file_hashes = tracked_paths
            .iter()
            .map(|p| (p.clone(), hash_file(p)))
            .collect();
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.put(
            key.into(),
            Entry {
                value,
                inserted_at: Instant::now(),
                ttl,
                file_hashes,
            },
        );
    }

    /// Remove a key, returning whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.pop(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.clear();
    }

    /// Current entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the running counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().expect("cache lock poisoned").stats
    }
}
