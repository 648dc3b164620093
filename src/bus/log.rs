use std::sync::{Arc, Mutex};

use super::message_bus::{MessageBus, PublishError};

/// Bus that logs each message through `tracing` and optionally mirrors it
/// into a shared buffer. Useful for dry runs and local development.
#[derive(Clone, Default)]
pub struct LogBus {
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl LogBus {
    pub fn new() -> Self {
        LogBus { buffer: None }
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        LogBus {
            buffer: Some(buffer),
        }
    }
}

impl MessageBus for LogBus {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        tracing::info!(topic, payload, "[OUTBOX] message sent");
        if let Some(buffer) = &self.buffer {
            buffer
                .lock()
                .map_err(|_| PublishError::ConnectionFailed("log bus buffer poisoned".into()))?
                .push(format!("[OUTBOX] {} {}", topic, payload));
        }
        Ok(())
    }
}
