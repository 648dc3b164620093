//! The bus contract the outbox publisher depends on.

use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a bus client. The publisher only needs to know that
/// the send did not succeed; every variant is retried on the next cycle.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Connection to the broker failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The broker refused the message
    #[error("message rejected: {0}")]
    Rejected(String),
    /// No acknowledgment within the client's deadline
    #[error("publish timeout")]
    Timeout,
    #[error("publish error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A message as handed to the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        BusMessage {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Client for the external message broker.
///
/// `send` is synchronous: `Ok` means the broker accepted the message. No
/// ordering, partitioning or delivery semantics beyond that are assumed.
///
/// Implementations might include:
/// - [`InMemoryBus`](super::InMemoryBus) for tests and single-process setups
/// - [`LogBus`](super::LogBus) for dry runs
/// - a Kafka, NATS or RabbitMQ producer living outside this crate
pub trait MessageBus: Send + Sync {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

impl<B: MessageBus + ?Sized> MessageBus for Arc<B> {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        (**self).send(topic, payload)
    }
}

impl<B: MessageBus + ?Sized> MessageBus for &B {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        (**self).send(topic, payload)
    }
}

impl<B: MessageBus + ?Sized> MessageBus for Box<B> {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        (**self).send(topic, payload)
    }
}
