use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{OrderPublisher, QueueError};
use crate::config::KafkaConfig;
use crate::health::HealthStatus;
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

// ============================================================================
// Kafka Order Producer
// ============================================================================
//
// Publishes the raw order payload with the order identifier as message key,
// so the broker routes every version of an order to the same partition.
// The ack policy (leader vs all in-sync replicas) comes from configuration.
//
// The circuit breaker only short-circuits calls while the broker is known to
// be down. No call is ever retried here.
//
// ============================================================================

pub struct KafkaOrderProducer {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
    circuit_breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
    closed: AtomicBool,
}

impl KafkaOrderProducer {
    /// Fails fast when no broker or topic is configured.
    pub fn new(config: &KafkaConfig, metrics: Arc<Metrics>) -> Result<Self, QueueError> {
        if config.brokers.is_empty() {
            return Err(QueueError::InvalidConfig("at least one broker is required".into()));
        }
        if config.topic.trim().is_empty() {
            return Err(QueueError::InvalidConfig("topic is required".into()));
        }

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("acks", config.acks.as_kafka_value())
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .set("linger.ms", "10")
            .create()?;

        tracing::info!(
            brokers = %config.brokers.join(","),
            topic = %config.topic,
            acks = config.acks.as_kafka_value(),
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            send_timeout: config.message_timeout,
            circuit_breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            metrics,
            closed: AtomicBool::new(false),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

#[async_trait]
impl OrderPublisher for KafkaOrderProducer {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }

        let result = self
            .circuit_breaker
            .call(async {
                let record = FutureRecord::to(&self.topic).key(key).payload(payload);

                self.producer
                    .send(record, Timeout::After(self.send_timeout))
                    .await
                    .map(|_| ())
                    .map_err(|(e, _)| QueueError::Kafka(e))
            })
            .await;

        self.metrics
            .update_circuit_breaker_state(self.circuit_breaker.state().as_gauge());

        match result {
            Ok(()) => {
                tracing::debug!(topic = %self.topic, key = %key, "Published order");
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(
                    topic = %self.topic,
                    key = %key,
                    "Circuit breaker open - broker unavailable"
                );
                Err(QueueError::CircuitOpen)
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::error!(
                    error = %e,
                    topic = %self.topic,
                    key = %key,
                    "Failed to publish order"
                );
                Err(e)
            }
        }
    }

    async fn close(&self, grace: Duration) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let producer = self.producer.clone();
        let flushed = tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(grace))
        })
        .await;

        match flushed {
            Ok(Ok(())) => tracing::info!("Kafka producer flushed and closed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Kafka producer flush incomplete"),
            Err(e) => tracing::warn!(error = %e, "Kafka producer flush task failed"),
        }
    }

    fn health(&self) -> HealthStatus {
        match self.circuit_state() {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded("circuit breaker half-open".into()),
            CircuitState::Open => HealthStatus::Unhealthy("circuit breaker open".into()),
        }
    }
}
