//! The shared, size-bounded response cache.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use thiserror::Error;

use crate::cache::entry::CacheEntry;
use crate::cache::list::{EntryList, SlotId};
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Rejected cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheConfigError {
    #[error("max_object_bytes must be greater than zero")]
    ZeroObjectSize,

    #[error("max_object_bytes ({object}) exceeds total_capacity_bytes ({total})")]
    ObjectExceedsCapacity { object: usize, total: usize },
}

/// Point-in-time view of cache occupancy and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes_used: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub rejections: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    rejections: AtomicU64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: EntryList<CacheEntry>,
    bytes_used: usize,
}

impl Inner {
    fn find(&self, key: &str) -> Option<SlotId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.key() == key)
            .map(|(id, _)| id)
    }

    fn least_recent(&self) -> Option<SlotId> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(id, _)| id)
    }

    fn unlink(&mut self, id: SlotId) -> Option<CacheEntry> {
        let entry = self.entries.remove(id)?;
        self.bytes_used -= entry.size();
        Some(entry)
    }
}

/// Byte-budgeted store of origin responses keyed by `host:port/path`.
///
/// Lookups take the shared lock and may run in parallel; inserts and
/// evictions take the exclusive lock. Recency is stamped lazily on hit
/// without moving the entry, and eviction scans for the smallest stamp.
/// Callers only ever receive copies of stored payloads.
#[derive(Debug)]
pub struct ResponseCache {
    inner: RwLock<Inner>,
    tick: AtomicU64,
    capacity: usize,
    max_object_bytes: usize,
    counters: Counters,
}

impl ResponseCache {
    /// Create an empty cache with the given budget.
    pub fn new(config: CacheConfig) -> Result<Self, CacheConfigError> {
        if config.max_object_bytes == 0 {
            return Err(CacheConfigError::ZeroObjectSize);
        }
        if config.max_object_bytes > config.total_capacity_bytes {
            return Err(CacheConfigError::ObjectExceedsCapacity {
                object: config.max_object_bytes,
                total: config.total_capacity_bytes,
            });
        }

        Ok(Self {
            inner: RwLock::new(Inner::default()),
            tick: AtomicU64::new(0),
            capacity: config.total_capacity_bytes,
            max_object_bytes: config.max_object_bytes,
            counters: Counters::default(),
        })
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up `key` and return a private copy of its payload.
    ///
    /// The copy is taken before the shared lock is released so a concurrent
    /// eviction can never free bytes the caller still reads.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let hit = {
            let inner = self.inner.read();
            inner.find(key).and_then(|id| inner.entries.get(id)).map(|entry| {
                let copy = entry.data().to_vec();
                entry.touch(self.next_tick());
                copy
            })
        };

        match &hit {
            Some(data) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup(true);
                tracing::trace!(key, bytes = data.len(), "Cache hit");
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup(false);
                tracing::trace!(key, "Cache miss");
            }
        }
        hit
    }

    /// Store `data` under `key`, replacing any previous entry.
    ///
    /// Returns `false` without touching the cache when the payload is larger
    /// than the per-object cap. Otherwise evicts least-recently-stamped
    /// entries until the new payload fits.
    pub fn put(&self, key: impl Into<String>, data: impl Into<Box<[u8]>>) -> bool {
        let key = key.into();
        let data = data.into();
        let size = data.len();

        if size > self.max_object_bytes {
            self.counters.rejections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, bytes = size, limit = self.max_object_bytes, "Object too large to cache");
            return false;
        }

        let mut inner = self.inner.write();

        if let Some(old) = inner.find(&key) {
            if let Some(replaced) = inner.unlink(old) {
                tracing::trace!(key = %key, bytes = replaced.size(), "Replacing cached entry");
            }
        }

        let mut evicted = 0u64;
        while inner.bytes_used + size > self.capacity {
            let Some(victim) = inner.least_recent() else {
                break;
            };
            if let Some(entry) = inner.unlink(victim) {
                tracing::debug!(key = entry.key(), bytes = entry.size(), recency = entry.recency(), "Evicted cache entry");
                evicted += 1;
            }
        }

        let entry = CacheEntry::new(key, data, self.next_tick());
        inner.entries.push_front(entry);
        inner.bytes_used += size;
        let bytes_used = inner.bytes_used;
        drop(inner);

        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
        self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        metrics::record_cache_evictions(evicted);
        metrics::record_cache_bytes(bytes_used);
        true
    }

    /// Whether `key` is resident. Does not count as a hit or bump recency.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().find(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.inner.read().bytes_used
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_object_bytes(&self) -> usize {
        self.max_object_bytes
    }

    /// Resident keys, newest insertion first.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|(_, entry)| entry.key().to_string())
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, bytes_used) = {
            let inner = self.inner.read();
            (inner.entries.len(), inner.bytes_used)
        };
        CacheStats {
            entries,
            bytes_used,
            capacity: self.capacity,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            rejections: self.counters.rejections.load(Ordering::Relaxed),
        }
    }

    /// Panics unless byte accounting, bounds and key uniqueness hold.
    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        let inner = self.inner.read();
        inner.entries.debug_validate_invariants();

        let mut seen = std::collections::HashSet::new();
        let mut total = 0;
        for (_, entry) in inner.entries.iter() {
            assert!(seen.insert(entry.key().to_string()), "duplicate key {}", entry.key());
            assert!(entry.size() <= self.max_object_bytes);
            total += entry.size();
        }
        assert_eq!(total, inner.bytes_used);
        assert!(inner.bytes_used <= self.capacity);
    }
}
