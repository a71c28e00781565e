use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::OrderCache;
use crate::domain::order::Order;

/// Size-bounded cache with insertion-order (FIFO) eviction.
///
/// A single lock guards both the map and the eviction queue, so every
/// access serializes. Each key appears in the queue exactly once, at the
/// position of its first insertion since it was last evicted.
pub struct BoundedCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, Arc<Order>>,
    insertion_order: VecDeque<String>,
}

impl BoundedCache {
    /// `capacity` is raised to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                insertion_order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn insert_new(&self, inner: &mut Inner, order_uid: &str, order: Arc<Order>) {
        inner.entries.insert(order_uid.to_string(), order);
        inner.insertion_order.push_back(order_uid.to_string());

        while inner.entries.len() > self.capacity {
            match inner.insertion_order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                    tracing::trace!(order_uid = %oldest, "Evicted order from bounded cache");
                }
                None => break,
            }
        }
    }
}

impl OrderCache for BoundedCache {
    fn set(&self, order_uid: &str, order: Arc<Order>) {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.entries.get_mut(order_uid) {
            *existing = order;
            return;
        }

        self.insert_new(&mut inner, order_uid, order);
    }

    fn fill(&self, order_uid: &str, order: Arc<Order>) -> Arc<Order> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.entries.get(order_uid) {
            return existing.clone();
        }

        self.insert_new(&mut inner, order_uid, order.clone());
        order
    }

    fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        self.inner.lock().entries.get(order_uid).cloned()
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::tests::sample_order;

    fn put(cache: &BoundedCache, uid: &str) {
        cache.set(uid, Arc::new(sample_order(uid)));
    }

    #[test]
    fn test_evicts_earliest_inserted() {
        let cache = BoundedCache::new(3);
        for uid in ["a1", "b2", "c3", "d4"] {
            put(&cache, uid);
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get("a1").is_none());
        for uid in ["b2", "c3", "d4"] {
            assert!(cache.get(uid).is_some(), "{uid} should still be cached");
        }
    }

    #[test]
    fn test_update_does_not_refresh_position() {
        let cache = BoundedCache::new(2);
        put(&cache, "a1");
        put(&cache, "b2");

        let mut updated = sample_order("a1");
        updated.track_number = "UPDATED".to_string();
        cache.set("a1", Arc::new(updated));
        put(&cache, "c3");

        assert!(cache.get("a1").is_none(), "FIFO must evict a1 despite the update");
        assert!(cache.get("b2").is_some());
        assert!(cache.get("c3").is_some());
    }

    #[test]
    fn test_reads_do_not_refresh_position() {
        let cache = BoundedCache::new(2);
        put(&cache, "a1");
        put(&cache, "b2");
        assert!(cache.get("a1").is_some());
        put(&cache, "c3");

        assert!(cache.get("a1").is_none());
    }

    #[test]
    fn test_evicted_key_reinserted_goes_to_back() {
        let cache = BoundedCache::new(2);
        put(&cache, "a1");
        put(&cache, "b2");
        put(&cache, "c3");
        put(&cache, "a1");
        put(&cache, "d4");

        assert!(cache.get("b2").is_none());
        assert!(cache.get("c3").is_none());
        assert!(cache.get("a1").is_some());
        assert!(cache.get("d4").is_some());
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let cache = BoundedCache::new(5);
        for i in 0..100 {
            put(&cache, &format!("order{i}"));
            assert!(cache.len() <= 5);
        }
        assert_eq!(cache.len(), 5);
        assert!(cache.get("order95").is_some());
        assert!(cache.get("order94").is_none());
    }

    #[test]
    fn test_fill_evicts_like_set() {
        let cache = BoundedCache::new(2);
        put(&cache, "a1");
        put(&cache, "b2");
        cache.fill("c3", Arc::new(sample_order("c3")));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a1").is_none());
        assert!(cache.get("c3").is_some());
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        put(&cache, "a1");
        assert_eq!(cache.len(), 1);
    }
}
