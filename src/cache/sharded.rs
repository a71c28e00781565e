use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

use super::OrderCache;
use crate::config::MIN_CACHE_SHARDS;
use crate::domain::order::Order;

type Shard = RwLock<HashMap<String, Arc<Order>>>;

/// Unbounded cache partitioned across independently locked shards.
pub struct ShardedCache {
    shards: Box<[Shard]>,
}

impl ShardedCache {
    /// `shard_count` is raised to the minimum of 4.
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(MIN_CACHE_SHARDS);
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, order_uid: &str) -> usize {
        (xxh3_64(order_uid.as_bytes()) % self.shards.len() as u64) as usize
    }

    fn shard_for(&self, order_uid: &str) -> &Shard {
        &self.shards[self.shard_index(order_uid)]
    }
}

impl OrderCache for ShardedCache {
    fn set(&self, order_uid: &str, order: Arc<Order>) {
        self.shard_for(order_uid)
            .write()
            .insert(order_uid.to_string(), order);
    }

    fn fill(&self, order_uid: &str, order: Arc<Order>) -> Arc<Order> {
        self.shard_for(order_uid)
            .write()
            .entry(order_uid.to_string())
            .or_insert(order)
            .clone()
    }

    fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        self.shard_for(order_uid).read().get(order_uid).cloned()
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::tests::sample_order;

    #[test]
    fn test_minimum_shard_count() {
        assert_eq!(ShardedCache::new(0).shard_count(), MIN_CACHE_SHARDS);
        assert_eq!(ShardedCache::new(16).shard_count(), 16);
    }

    #[test]
    fn test_no_eviction() {
        let cache = ShardedCache::new(4);
        for i in 0..500 {
            let uid = format!("order{i}");
            cache.set(&uid, Arc::new(sample_order(&uid)));
        }

        assert_eq!(cache.len(), 500);
        assert!(cache.get("order0").is_some());
        assert!(cache.get("order499").is_some());
    }

    #[test]
    fn test_keys_spread_across_shards() {
        let cache = ShardedCache::new(8);
        let mut used = std::collections::HashSet::new();
        for i in 0..200 {
            used.insert(cache.shard_index(&format!("order{i}")));
        }
        assert_eq!(used.len(), 8);
    }

    #[test]
    fn test_shard_index_is_stable() {
        let cache = ShardedCache::new(8);
        assert_eq!(cache.shard_index("abc123"), cache.shard_index("abc123"));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(ShardedCache::new(4));
        let order = Arc::new(sample_order("shared"));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                let order = order.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let uid = format!("t{t}o{i}");
                        cache.set(&uid, order.clone());
                        assert!(cache.get(&uid).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
