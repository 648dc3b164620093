use std::sync::Mutex;

use event_emitter_rs::EventEmitter;

use super::message_bus::{MessageBus, PublishError};

/// Bus that hands each message to in-process listeners registered on an
/// `EventEmitter`, using the topic as the event name.
///
/// Listeners run on the emitter's own threads, so delivery is asynchronous
/// to the caller of `send`.
/// Requires the `emitter` feature.
pub struct EmitterBus {
    emitter: Mutex<EventEmitter>,
}

impl EmitterBus {
    pub fn new(emitter: EventEmitter) -> Self {
        EmitterBus {
            emitter: Mutex::new(emitter),
        }
    }

    /// Register a listener for every payload sent to `topic`.
    pub fn on<F>(&self, topic: &str, listener: F) -> Result<(), PublishError>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter
            .lock()
            .map_err(|_| PublishError::ConnectionFailed("emitter poisoned".into()))?
            .on(topic, listener);
        Ok(())
    }
}

impl Default for EmitterBus {
    fn default() -> Self {
        Self::new(EventEmitter::new())
    }
}

impl MessageBus for EmitterBus {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        let mut emitter = self
            .emitter
            .lock()
            .map_err(|_| PublishError::ConnectionFailed("emitter poisoned".into()))?;
        emitter.emit(topic, payload.to_string());
        Ok(())
    }
}
