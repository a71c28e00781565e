use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{OrderStore, StoreError};
use crate::domain::order::Order;

/// In-process store for tests. Mirrors the upsert semantics of the Postgres
/// store and can be told to fail, to exercise the error paths.
#[derive(Default)]
pub(crate) struct MemoryOrderStore {
    rows: RwLock<HashMap<String, (u64, Order)>>,
    write_seq: AtomicUsize,
    reads: AtomicUsize,
    fail_upserts: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryOrderStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    pub(crate) fn row(&self, order_uid: &str) -> Option<Order> {
        self.rows.read().get(order_uid).map(|(_, order)| order.clone())
    }

    /// Number of `get` calls served so far.
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn upsert(&self, order: &Order) -> Result<(), StoreError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected upsert failure".to_string()));
        }
        let seq = self.write_seq.fetch_add(1, Ordering::SeqCst) as u64;
        self.rows
            .write()
            .insert(order.order_uid.clone(), (seq, order.clone()));
        Ok(())
    }

    async fn get(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(self.row(order_uid))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.read();
        let mut orders: Vec<&(u64, Order)> = rows.values().collect();
        orders.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(orders
            .into_iter()
            .take(limit)
            .map(|(_, order)| order.clone())
            .collect())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::tests::sample_order;

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row() {
        let store = MemoryOrderStore::new();
        let order = sample_order("abc123");

        store.upsert(&order).await.unwrap();
        store.upsert(&order).await.unwrap();

        assert_eq!(store.row_count(), 1);
        assert_eq!(store.row("abc123"), Some(order));
    }

    #[tokio::test]
    async fn test_upsert_replaces_content() {
        let store = MemoryOrderStore::new();
        let mut order = sample_order("abc123");
        store.upsert(&order).await.unwrap();

        order.track_number = "UPDATED".to_string();
        store.upsert(&order).await.unwrap();

        assert_eq!(store.row_count(), 1);
        assert_eq!(store.get("abc123").await.unwrap().unwrap().track_number, "UPDATED");
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let store = MemoryOrderStore::new();
        for uid in ["a1", "b2", "c3"] {
            store.upsert(&sample_order(uid)).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        let uids: Vec<&str> = recent.iter().map(|o| o.order_uid.as_str()).collect();
        assert_eq!(uids, vec!["c3", "b2"]);
    }
}
