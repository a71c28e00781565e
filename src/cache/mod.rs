// ============================================================================
// Read-Through Order Cache
// ============================================================================
//
// In-process projection of store state. Never authoritative: a miss always
// falls back to the store and the result is written back before returning.
//
// Two interchangeable policies behind one `set`/`fill`/`get` contract:
// - Sharded: unbounded, key space split across independently locked
//   segments. Readers and writers on different shards never contend.
// - Bounded: one lock over map + insertion order, evicts the oldest inserted
//   key past capacity. Updating an existing key does not move it (FIFO).
//
// Both guarantee read-after-write within the process: once `set(k, v)`
// returns, any later `get(k)` sees `v` until the next `set(k, ..)`.
//
// Values are stored as `Arc<Order>` so a lookup holds its lock only long
// enough to clone a pointer.
//
// ============================================================================

mod bounded;
mod sharded;

use std::sync::Arc;

use crate::config::{CacheConfig, CachePolicy};
use crate::domain::order::Order;

pub use bounded::BoundedCache;
pub use sharded::ShardedCache;

pub trait OrderCache: Send + Sync {
    fn set(&self, order_uid: &str, order: Arc<Order>);

    /// Insert only if the key is absent and return whatever is cached
    /// afterwards. The read path uses this so a value fetched from the store
    /// never replaces a newer one the consumer cached in the meantime.
    fn fill(&self, order_uid: &str, order: Arc<Order>) -> Arc<Order>;

    fn get(&self, order_uid: &str) -> Option<Arc<Order>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the cache selected by configuration. One instance per process,
/// shared by the consumer and the request path.
pub fn build_cache(config: &CacheConfig) -> Arc<dyn OrderCache> {
    match config.policy {
        CachePolicy::Sharded => {
            let cache = ShardedCache::new(config.shards);
            tracing::info!(shards = cache.shard_count(), "Using sharded order cache");
            Arc::new(cache)
        }
        CachePolicy::Bounded => {
            let cache = BoundedCache::new(config.size);
            tracing::info!(capacity = cache.capacity(), "Using bounded order cache");
            Arc::new(cache)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::tests::sample_order;

    fn configs() -> Vec<CacheConfig> {
        vec![
            CacheConfig {
                policy: CachePolicy::Sharded,
                size: 10,
                shards: 4,
                warmup_limit: 0,
            },
            CacheConfig {
                policy: CachePolicy::Bounded,
                size: 10,
                shards: 4,
                warmup_limit: 0,
            },
        ]
    }

    #[test]
    fn test_read_after_write_for_both_policies() {
        for config in configs() {
            let cache = build_cache(&config);
            assert!(cache.get("abc123").is_none());

            cache.set("abc123", Arc::new(sample_order("abc123")));
            assert_eq!(cache.get("abc123").unwrap().order_uid, "abc123");

            let mut updated = sample_order("abc123");
            updated.track_number = "NEWTRACK".to_string();
            cache.set("abc123", Arc::new(updated));
            assert_eq!(cache.get("abc123").unwrap().track_number, "NEWTRACK");
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn test_fill_keeps_existing_entry() {
        for config in configs() {
            let cache = build_cache(&config);

            let filled = cache.fill("abc123", Arc::new(sample_order("abc123")));
            assert_eq!(filled.track_number, "WBILMTESTTRACK");

            let mut newer = sample_order("abc123");
            newer.track_number = "NEWER".to_string();
            cache.set("abc123", Arc::new(newer));

            let stale = sample_order("abc123");
            let kept = cache.fill("abc123", Arc::new(stale));
            assert_eq!(kept.track_number, "NEWER");
            assert_eq!(cache.get("abc123").unwrap().track_number, "NEWER");
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn test_write_visible_to_other_threads() {
        for config in configs() {
            let cache = build_cache(&config);
            cache.set("abc123", Arc::new(sample_order("abc123")));

            let reader = cache.clone();
            let seen = std::thread::spawn(move || reader.get("abc123").map(|o| o.order_uid.clone()))
                .join()
                .unwrap();
            assert_eq!(seen.as_deref(), Some("abc123"));
        }
    }
}
