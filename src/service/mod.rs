use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::OrderCache;
use crate::domain::order::{
    normalize_order_uid, validate_envelope, Order, OrderEnvelope, ValidationError,
};
use crate::health::{HealthStatus, SystemHealth};
use crate::ingest::OrderConsumer;
use crate::messaging::{partition_key, MessageSource, OrderPublisher, QueueError};
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreError};

// ============================================================================
// Order Service - Orchestrates queue, store and cache
// ============================================================================
//
// Write path: HTTP -> publish -> queue -> consumer -> store upsert -> cache
// Read path:  HTTP -> cache hit, or store lookup -> cache fill -> response
//
// No transaction spans queue, store and cache. Consistency rests on the
// idempotent upsert and on the read path refilling the cache from the store
// on every miss.
//
// The service also owns the consumer task: it is started once, bound to the
// process-wide shutdown token, and awaited (or aborted after the grace
// period) during shutdown.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Acknowledgement for a queued order.
#[derive(Debug, Clone, Serialize)]
pub struct Accepted {
    pub status: &'static str,
    pub order_uid: String,
}

pub struct OrderService {
    publisher: Arc<dyn OrderPublisher>,
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl OrderService {
    pub fn new(
        publisher: Arc<dyn OrderPublisher>,
        store: Arc<dyn OrderStore>,
        cache: Arc<dyn OrderCache>,
        metrics: Arc<Metrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            publisher,
            store,
            cache,
            metrics,
            shutdown,
            consumer: Mutex::new(None),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validate the required fields of a raw payload and queue it unchanged.
    pub async fn publish(&self, raw: &[u8]) -> Result<Accepted, ServiceError> {
        let envelope = match parse_envelope(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.metrics.record_publish(false, "invalid");
                return Err(e.into());
            }
        };

        let key = partition_key(Some(&envelope.order_uid), raw);

        if let Err(e) = self.publisher.publish(&key, raw).await {
            self.metrics.record_publish(false, "queue");
            return Err(e.into());
        }

        self.metrics.record_publish(true, "");
        tracing::info!(order_uid = %envelope.order_uid, "📤 Order queued");

        Ok(Accepted {
            status: "queued",
            order_uid: envelope.order_uid,
        })
    }

    /// Cache first; on a miss read the store and fill the cache.
    pub async fn get(&self, order_uid: &str) -> Result<Option<Arc<Order>>, ServiceError> {
        if let Some(order) = self.cache.get(order_uid) {
            self.metrics.record_cache_lookup(true);
            return Ok(Some(order));
        }
        self.metrics.record_cache_lookup(false);

        match self.store.get(order_uid).await? {
            Some(order) => {
                // A consumer write that landed while the store read was in
                // flight is newer than `order`; keep it.
                let cached = self.cache.fill(order_uid, Arc::new(order));
                tracing::debug!(order_uid = %order_uid, "Cache filled from store");
                Ok(Some(cached))
            }
            None => Ok(None),
        }
    }

    /// Preload up to `limit` recently written orders. Failures are logged;
    /// the read path fills the cache on demand anyway.
    pub async fn warm_cache(&self, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }

        match self.store.recent(limit).await {
            Ok(orders) => {
                let count = orders.len();
                // Oldest first, so a bounded cache keeps the newest.
                for order in orders.into_iter().rev() {
                    let order_uid = order.order_uid.clone();
                    self.cache.fill(&order_uid, Arc::new(order));
                }
                tracing::info!(count, "🔥 Cache warmed from store");
                count
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cache warm-up failed, continuing cold");
                0
            }
        }
    }

    /// Spawn the consumer loop. Only one loop runs per service.
    pub fn start_consumer<S>(&self, source: S, poll_backoff: Duration)
    where
        S: MessageSource + 'static,
    {
        let mut slot = self.consumer.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::warn!("Consumer already running, ignoring second start");
            source.close();
            return;
        }

        let consumer = OrderConsumer::new(
            source,
            self.store.clone(),
            self.cache.clone(),
            self.metrics.clone(),
            self.shutdown.clone(),
            poll_backoff,
        );
        *slot = Some(tokio::spawn(consumer.run()));
    }

    /// Stop polling, close the reader, the queue writer and the store.
    ///
    /// Each step gets `grace`; a consumer that does not finish in time is
    /// aborted rather than leaked.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!("🛑 Shutting down order service");
        self.shutdown.cancel();

        let handle = self.consumer.lock().take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => tracing::info!("Consumer stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "Consumer task failed"),
                Err(_) => {
                    tracing::warn!(grace_ms = grace.as_millis() as u64, "Consumer did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        if tokio::time::timeout(grace, self.publisher.close(grace)).await.is_err() {
            tracing::warn!("Timed out closing queue writer");
        }
        if tokio::time::timeout(grace, self.store.close()).await.is_err() {
            tracing::warn!("Timed out closing store");
        }

        tracing::info!("Order service shut down");
    }

    pub fn health(&self) -> SystemHealth {
        let consumer = match self.consumer.lock().as_ref() {
            _ if self.shutdown.is_cancelled() => HealthStatus::Degraded("shutting down".to_string()),
            None => HealthStatus::Unhealthy("consumer not started".to_string()),
            Some(handle) if handle.is_finished() => {
                HealthStatus::Unhealthy("consumer loop exited".to_string())
            }
            Some(_) => HealthStatus::Healthy,
        };

        let mut components = BTreeMap::new();
        components.insert("queue_producer".to_string(), self.publisher.health());
        components.insert("queue_consumer".to_string(), consumer);
        SystemHealth::from_components(components)
    }
}

fn parse_envelope(raw: &[u8]) -> Result<OrderEnvelope, ValidationError> {
    let mut envelope: OrderEnvelope = serde_json::from_slice(raw)
        .map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;
    normalize_order_uid(&mut envelope.order_uid);
    validate_envelope(&envelope)?;
    Ok(envelope)
}

// ============================================================================
// Unit Tests
// ============================================================================
