//! Best-effort result cache.
//!
//! Stores full, unpaginated query results keyed by
//! `"{dataset_id}::{query discriminant}"` with a bounded TTL and LRU
//! eviction. The cache is strictly best-effort: every internal fault
//! (lock poisoning) is logged and treated as a miss or a dropped write,
//! never surfaced to the caller. Entries are not invalidated from inside
//! the engine; an external data-mutation event calls
//! [`ResultCache::invalidate_dataset`].
//!
//! Two equivalent concurrent queries may both compute and write the same
//! key; last-writer-wins is harmless because the value is a pure function
//! of the same dataset and query.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

use super::executor::QueryResult;
use crate::config::CacheConfig;

/// Default time-to-live for cached results
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(300);

/// Default entry capacity
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// A cached value with its expiry bookkeeping
#[derive(Clone)]
struct CacheEntry {
    value: QueryResult,
    created_at: Instant,
    last_accessed: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(value: QueryResult, ttl: Duration) -> Self {
        let now = Instant::now();
        CacheEntry {
            value,
            created_at: now,
            last_accessed: now,
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,

    /// Number of cache misses
    pub misses: usize,

    /// Number of entries evicted at capacity
    pub evictions: usize,

    /// Number of entries dropped on expiry
    pub expirations: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe TTL + LRU cache for full query results.
///
/// Cloning shares the underlying store, so one handle can be injected into
/// several executors.
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: usize,
    ttl: Duration,
    stats: Arc<RwLock<CacheStats>>,
}

impl ResultCache {
    /// Create a cache with explicit capacity and TTL
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        ResultCache {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
            ttl,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// Create a cache with default settings (256 entries, 5-minute TTL)
    pub fn with_defaults() -> Self {
        ResultCache::new(DEFAULT_MAX_ENTRIES, DEFAULT_RESULT_TTL)
    }

    /// Build from configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        ResultCache::new(config.max_entries, Duration::from_secs(config.ttl_secs))
    }

    /// Compose the cache key for a dataset and query discriminant
    pub fn key(dataset_id: &str, discriminant: &str) -> String {
        format!("{dataset_id}::{discriminant}")
    }

    /// Look up a full result. Expired entries are dropped on access; any
    /// internal fault is logged and reported as a miss.
    pub fn get(&self, key: &str) -> Option<QueryResult> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "result_cache_read_failed");
                self.record(|s| s.misses += 1);
                return None;
            }
        };

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired() {
                entries.remove(key);
                self.record(|s| {
                    s.misses += 1;
                    s.expirations += 1;
                });
                return None;
            }
            entry.touch();
            let value = entry.value.clone();
            self.record(|s| s.hits += 1);
            return Some(value);
        }

        self.record(|s| s.misses += 1);
        None
    }

    /// Store a full result. At capacity, expired entries are evicted first,
    /// then the least recently used one. Faults are logged and the write is
    /// dropped.
    pub fn put(&self, key: String, value: QueryResult) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "result_cache_write_failed");
                return;
            }
        };

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            self.evict_one(&mut entries);
        }
        entries.insert(key, CacheEntry::new(value, self.ttl));
    }

    /// Drop every entry belonging to a dataset (delete-by-prefix). Called
    /// by the embedding service when the dataset's contents change.
    pub fn invalidate_dataset(&self, dataset_id: &str) {
        let prefix = format!("{dataset_id}::");
        match self.entries.write() {
            Ok(mut entries) => {
                entries.retain(|key, _| !key.starts_with(&prefix));
            }
            Err(e) => {
                warn!(error = %e, dataset_id, "result_cache_invalidate_failed");
            }
        }
    }

    fn evict_one(&self, entries: &mut HashMap<String, CacheEntry>) {
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(k, _)| k.clone())
            .collect();

        if !expired.is_empty() {
            let count = expired.len();
            for key in expired {
                entries.remove(&key);
            }
            self.record(|s| s.expirations += count);
            return;
        }

        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(k, _)| k.clone())
        {
            entries.remove(&key);
            self.record(|s| s.evictions += 1);
        }
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }

    /// Snapshot of the statistics counters
    pub fn stats(&self) -> CacheStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of live entries (including not-yet-collected expired ones)
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Clone for ResultCache {
    fn clone(&self) -> Self {
        ResultCache {
            entries: Arc::clone(&self.entries),
            max_entries: self.max_entries,
            ttl: self.ttl,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
