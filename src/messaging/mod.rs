// ============================================================================
// Messaging - Durable queue plumbing
// ============================================================================
//
// - `OrderPublisher`: publishes raw order payloads keyed by order_uid
// - `MessageSource`: yields queued messages to the consumer loop
// - `partition_key`: decoded identifier, or a best-effort scan of raw bytes
//
// Kafka-backed implementations live in `producer` and `source`. Delivery is
// at-least-once; there is no ordering guarantee across partitions.
//
// ============================================================================

mod producer;
mod routing_key;
mod source;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::time::Duration;
use rdkafka::error::KafkaError;

use crate::health::HealthStatus;

pub use producer::KafkaOrderProducer;
pub use routing_key::partition_key;
pub use source::KafkaMessageSource;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("circuit breaker open, broker unavailable")]
    CircuitOpen,

    #[error("kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("message source closed")]
    Closed,
}

/// A message as read from the queue. `payload` is byte-for-byte what the
/// publisher sent.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

impl QueueMessage {
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_deref().and_then(|k| std::str::from_utf8(k).ok())
    }
}

#[async_trait]
pub trait OrderPublisher: Send + Sync {
    /// Publish one message. Failure is reported to the caller, never retried.
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), QueueError>;

    /// Flush pending deliveries, waiting at most `grace`, and release the writer.
    async fn close(&self, grace: Duration);

    fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next message.
    async fn recv(&self) -> Result<QueueMessage, QueueError>;

    /// Leave the consumer group and release the reader.
    fn close(&self);
}
