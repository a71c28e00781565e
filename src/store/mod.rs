// ============================================================================
// Order Store - System of record
// ============================================================================
//
// The store is the only authoritative copy of an order. Writes go through a
// single idempotent upsert keyed by `order_uid`: applying the same order
// twice leaves one row equal to that order, applying a changed order under
// the same key leaves one row with the latest content.
//
// Absence on lookup is `Ok(None)`, never an error.
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::domain::order::Order;

pub use postgres::PgOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order, or replace every field of the existing row.
    async fn upsert(&self, order: &Order) -> Result<(), StoreError>;

    /// Point lookup by identifier.
    async fn get(&self, order_uid: &str) -> Result<Option<Order>, StoreError>;

    /// Up to `limit` orders, most recently written first. Used for cache warm-up.
    async fn recent(&self, limit: usize) -> Result<Vec<Order>, StoreError>;

    /// Release the underlying connections.
    async fn close(&self);
}
