// ABOUTME: Cache implementation that never stores anything
// ABOUTME: Same contract as the real cache, for A/B comparison and opt-out

use std::sync::atomic::{AtomicU64, Ordering};

use super::{CacheStats, CachedExecution, ResultCache};

/// Always misses; writes are discarded. Lookups are still counted so hit
/// rates can be compared against a real cache.
#[derive(Debug, Default)]
pub struct NoOpCache {
    misses: AtomicU64,
}

impl NoOpCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for NoOpCache {
    fn get(&self, _key: &str) -> Option<CachedExecution> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn set(&self, _key: String, _value: CachedExecution, _task_version: Option<String>) {}

    fn invalidate(&self, _pattern: &str) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: 0,
            misses: self.misses.load(Ordering::Relaxed),
            evictions: 0,
            entry_count: 0,
            max_entries: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Context, NextAction};
    use serde_json::json;

    #[test]
    fn test_always_misses() {
        let cache = NoOpCache::new();
        cache.set(
            "k".to_string(),
            CachedExecution {
                context: Context::new(json!({})),
                next: NextAction::Terminal,
            },
            None,
        );

        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
