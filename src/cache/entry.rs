//! A single cached response.

use std::sync::atomic::{AtomicU64, Ordering};

/// A stored response blob.
///
/// The payload is immutable once stored. `recency` is the only field that
/// changes after insertion and is written by readers holding the shared lock,
/// hence the atomic.
#[derive(Debug)]
pub struct CacheEntry {
    key: String,
    data: Box<[u8]>,
    recency: AtomicU64,
}

impl CacheEntry {
    pub(crate) fn new(key: String, data: Box<[u8]>, tick: u64) -> Self {
        Self {
            key,
            data,
            recency: AtomicU64::new(tick),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn recency(&self) -> u64 {
        self.recency.load(Ordering::Relaxed)
    }

    /// Concurrent readers may race; the larger tick always wins.
    pub(crate) fn touch(&self, tick: u64) {
        self.recency.fetch_max(tick, Ordering::Relaxed);
    }
}
