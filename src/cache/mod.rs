//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Connection handler
//!     → ResponseCache::get (shared lock, linear scan, copy out, stamp recency)
//!         hit  → bytes written to client verbatim
//!         miss → origin round trip
//!     → ResponseCache::put (exclusive lock, replace same key,
//!                           evict smallest recency until it fits, push to head)
//! ```
//!
//! # Design Decisions
//! - Approximate LRU: a hit stamps a tick on the entry and never relinks it;
//!   eviction scans every entry for the smallest tick. Reads stay cheap and
//!   never touch list links, eviction is O(n).
//! - Lookup is a linear scan; occupancy is bounded by
//!   `total_capacity_bytes` and expected to stay small.
//! - Entries live in an index arena (`list.rs`), so unlinking never leaves a
//!   dangling reference for a concurrent reader.
//! - One instance per process, built in `main` and shared through `Arc`;
//!   tests build their own.

pub mod entry;
pub mod list;
pub mod store;

pub use entry::CacheEntry;
pub use store::{CacheConfigError, CacheStats, ResponseCache};
