//! In-memory bus for testing and single-process scenarios.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::message_bus::{BusMessage, MessageBus, PublishError};

/// In-memory bus keeping every accepted message in an append-only log.
///
/// Features:
/// - Thread-safe (share across threads via `Clone`)
/// - Independent consumers via [`InMemoryBus::new_consumer`], each with its
///   own read position
///
/// ```
/// use outbox_relay::bus::{InMemoryBus, MessageBus};
///
/// let bus = InMemoryBus::new();
/// bus.send("employee-events", "EmployeeEvent[...]").unwrap();
///
/// let consumer = bus.new_consumer();
/// let message = consumer.poll(10).unwrap();
/// assert_eq!(message.topic, "employee-events");
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    log: Arc<RwLock<Vec<BusMessage>>>,
    position: Arc<Mutex<usize>>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            log: Arc::new(RwLock::new(Vec::new())),
            position: Arc::new(Mutex::new(0)),
        }
    }

    /// Another handle on the same log with its own read position.
    pub fn new_consumer(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            position: Arc::new(Mutex::new(0)),
        }
    }

    /// All messages in send order.
    pub fn messages(&self) -> Vec<BusMessage> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages_on(&self, topic: &str) -> Vec<BusMessage> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    /// Payloads sent to one topic, in send order.
    pub fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.messages_on(topic)
            .into_iter()
            .map(|message| message.payload)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next unread message for this consumer, waiting up to `timeout_ms`.
    pub fn poll(&self, timeout_ms: u64) -> Option<BusMessage> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            {
                let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
                let mut position = self.position.lock().unwrap_or_else(PoisonError::into_inner);
                if *position < log.len() {
                    let message = log[*position].clone();
                    *position += 1;
                    return Some(message);
                }
            }

            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Drop every message (test cleanup).
    pub fn clear(&self) {
        self.log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = 0;
    }
}

impl MessageBus for InMemoryBus {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.log
            .write()
            .map_err(|_| PublishError::ConnectionFailed("in-memory bus poisoned".into()))?
            .push(BusMessage::new(topic, payload));
        Ok(())
    }
}
