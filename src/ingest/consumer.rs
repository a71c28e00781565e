use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::cache::OrderCache;
use crate::domain::order::{normalize_order_uid, validate_order, Order};
use crate::messaging::{MessageSource, QueueMessage};
use crate::metrics::Metrics;
use crate::store::OrderStore;

// ============================================================================
// Queue Consumer - turns at-least-once messages into idempotent writes
// ============================================================================
//
// One long-running loop per process:
//
//   POLLING -> DECODING -> VALIDATING -> PERSISTING -> CACHING -> POLLING
//        \________ any failure: log, count, back to POLLING ________/
//
// - Poison messages (undecodable or invalid) are skipped, never fatal.
// - Broker read errors back off for a fixed delay and poll again, forever.
//   That is a liveness retry, not a data retry.
// - A failed upsert is logged and the message is dropped. The broker offset
//   has already advanced, so the update is lost unless the order is
//   redelivered or published again. There is no dead-letter queue.
// - The cache is only written after the store accepted the order, so it
//   never holds a value the store does not have.
//
// Shutdown is cooperative: the token is checked between messages and
// interrupts both the poll wait and the backoff sleep.
//
// ============================================================================

/// What happened to a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Persisted,
    Malformed,
    Invalid,
    StoreFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Persisted => "persisted",
            Outcome::Malformed => "malformed",
            Outcome::Invalid => "invalid",
            Outcome::StoreFailed => "store_failed",
        }
    }
}

pub struct OrderConsumer<S: MessageSource> {
    source: S,
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
    poll_backoff: Duration,
}

impl<S: MessageSource> OrderConsumer<S> {
    pub fn new(
        source: S,
        store: Arc<dyn OrderStore>,
        cache: Arc<dyn OrderCache>,
        metrics: Arc<Metrics>,
        shutdown: CancellationToken,
        poll_backoff: Duration,
    ) -> Self {
        Self {
            source,
            store,
            cache,
            metrics,
            shutdown,
            poll_backoff,
        }
    }

    /// Run until the shutdown token fires, then close the reader.
    pub async fn run(self) {
        tracing::info!("🔄 Order consumer started");

        loop {
            let polled = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                polled = self.source.recv() => polled,
            };

            match polled {
                Ok(message) => {
                    self.handle_message(&message).await;
                }
                Err(e) => {
                    self.metrics.consumer_poll_errors.inc();
                    tracing::warn!(
                        error = %e,
                        backoff_ms = self.poll_backoff.as_millis() as u64,
                        "Queue read error, backing off"
                    );

                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_backoff) => {}
                    }
                }
            }
        }

        self.source.close();
        tracing::info!("🛑 Order consumer stopped");
    }

    /// Decode, validate, persist and cache one message.
    pub async fn handle_message(&self, message: &QueueMessage) -> Outcome {
        let started = Instant::now();
        let outcome = self.process(message).await;
        self.metrics
            .record_consumed(outcome.as_str(), started.elapsed().as_secs_f64());
        outcome
    }

    async fn process(&self, message: &QueueMessage) -> Outcome {
        let key = message.key_str().unwrap_or("<none>");

        let mut order: Order = match serde_json::from_slice(&message.payload) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Skipping malformed order payload"
                );
                return Outcome::Malformed;
            }
        };

        normalize_order_uid(&mut order.order_uid);

        if let Err(e) = validate_order(&order) {
            tracing::warn!(
                order_uid = %order.order_uid,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Skipping invalid order"
            );
            return Outcome::Invalid;
        }

        if let Err(e) = self.store.upsert(&order).await {
            tracing::error!(
                order_uid = %order.order_uid,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Failed to persist order, update dropped"
            );
            return Outcome::StoreFailed;
        }

        tracing::info!(
            order_uid = %order.order_uid,
            partition = message.partition,
            offset = message.offset,
            "✅ Order persisted"
        );

        let order_uid = order.order_uid.clone();
        self.cache.set(&order_uid, Arc::new(order));

        Outcome::Persisted
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
