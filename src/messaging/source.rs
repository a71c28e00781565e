use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    Message,
};

use super::{MessageSource, QueueError, QueueMessage};
use crate::config::KafkaConfig;

/// Kafka consumer-group reader.
///
/// Offsets are auto-committed: once a message has been handed to the consumer
/// loop, the group will not redeliver it to this process even if persisting
/// it fails.
pub struct KafkaMessageSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaMessageSource {
    pub fn new(config: &KafkaConfig) -> Result<Self, QueueError> {
        if config.brokers.is_empty() {
            return Err(QueueError::InvalidConfig("at least one broker is required".into()));
        }
        if config.group_id.trim().is_empty() {
            return Err(QueueError::InvalidConfig("consumer group id is required".into()));
        }

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("fetch.min.bytes", "1")
            .set("fetch.max.bytes", (1 << 20).to_string())
            .create()?;

        consumer.subscribe(&[config.topic.as_str()])?;

        tracing::info!(
            topic = %config.topic,
            group_id = %config.group_id,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    async fn recv(&self) -> Result<QueueMessage, QueueError> {
        let message = self.consumer.recv().await?;

        Ok(QueueMessage {
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            partition: message.partition(),
            offset: message.offset(),
        })
    }

    fn close(&self) {
        self.consumer.unsubscribe();
        tracing::info!(topic = %self.topic, "Kafka consumer closed");
    }
}
