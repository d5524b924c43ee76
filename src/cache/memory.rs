// ABOUTME: Bounded in-memory result cache with TTL expiry and LRU eviction
// ABOUTME: One coarse mutex around an insertion-ordered map; order is recency

use glob::Pattern;
use indexmap::IndexMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{CacheStats, CachedExecution, ResultCache};

struct CacheEntry {
    value: CachedExecution,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
    task_version: Option<String>,
}

impl CacheEntry {
    fn expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

struct CacheInner {
    // IndexMap insertion order doubles as the recency order: front is LRU,
    // back is MRU.
    entries: IndexMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// In-memory LRU+TTL cache for successful execution results.
///
/// All operations take the one lock; nothing awaits while holding it.
pub struct InMemoryCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
    default_ttl: Duration,
}

impl InMemoryCache {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: IndexMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_entries,
            default_ttl,
        }
    }

    /// Hit count for a single entry, if present and live.
    pub fn hit_count(&self, key: &str) -> Option<u64> {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.get(key).map(|e| e.hit_count)
    }

    /// Task version recorded when the entry was stored.
    pub fn entry_version(&self, key: &str) -> Option<Option<String>> {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.get(key).map(|e| e.task_version.clone())
    }
}

impl ResultCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<CachedExecution> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        let expired = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => entry.expired(),
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            inner.entries.shift_remove(key);
            inner.misses += 1;
            inner.evictions += 1;
            return None;
        }

        // Move to MRU position, then bump the hit count
        let mut entry = inner
            .entries
            .shift_remove(key)
            .expect("entry present under lock");
        entry.hit_count += 1;
        let value = entry.value.clone();
        inner.entries.insert(key.to_string(), entry);
        inner.hits += 1;
        Some(value)
    }

    fn set(&self, key: String, value: CachedExecution, task_version: Option<String>) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            if let Some((evicted, _)) = inner.entries.shift_remove_index(0) {
                debug!("Evicted LRU cache entry: {}", evicted);
                inner.evictions += 1;
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl: self.default_ttl,
                hit_count: 0,
                task_version,
            },
        );
    }

    fn invalidate(&self, pattern: &str) -> usize {
        let glob = match Pattern::new(pattern) {
            Ok(glob) => glob,
            Err(e) => {
                warn!("Invalid cache invalidation pattern {:?}: {}", pattern, e);
                return 0;
            }
        };

        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let matching: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| glob.matches(key))
            .cloned()
            .collect();

        for key in &matching {
            inner.entries.shift_remove(key);
        }

        debug!("Invalidated {} entries matching {:?}", matching.len(), pattern);
        matching.len()
    }

    fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache lock poisoned");
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entry_count: inner.entries.len(),
            max_entries: self.max_entries,
        }
    }
}
