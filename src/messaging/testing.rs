use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{MessageSource, OrderPublisher, QueueError, QueueMessage};

/// Publisher that records every message instead of sending it.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail: AtomicBool,
    closed: AtomicBool,
}

impl RecordingPublisher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    pub(crate) fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderPublisher for RecordingPublisher {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), QueueError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueueError::CircuitOpen);
        }
        self.published.lock().push((key.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn close(&self, _grace: Duration) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Items a test can push into a [`ChannelSource`].
pub(crate) enum SourceEvent {
    Message(QueueMessage),
    ReadError,
}

/// Message source fed from a tokio channel. Once the sender is dropped the
/// source blocks forever, like a broker with no traffic.
pub(crate) struct ChannelSource {
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SourceEvent>>,
    closed: Arc<AtomicBool>,
}

impl ChannelSource {
    pub(crate) fn new() -> (mpsc::UnboundedSender<SourceEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            rx: tokio::sync::Mutex::new(rx),
            closed: Arc::new(AtomicBool::new(false)),
        };
        (tx, source)
    }

    /// Flag set once the consumer closes the source.
    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&self) -> Result<QueueMessage, QueueError> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(SourceEvent::Message(message)) => Ok(message),
            Some(SourceEvent::ReadError) => Err(QueueError::Closed),
            None => std::future::pending().await,
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Queue message carrying `payload` as published under `key`.
pub(crate) fn message(key: &str, payload: &[u8], offset: i64) -> QueueMessage {
    QueueMessage {
        key: Some(key.as_bytes().to_vec()),
        payload: payload.to_vec(),
        partition: 0,
        offset,
    }
}
