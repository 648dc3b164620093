//! Message bus clients.
//!
//! The outbox core only depends on [`MessageBus::send`]. Everything else in
//! this module is a ready-made client:
//!
//! ```text
//! ┌──────────────────────┐      send(topic, payload)      ┌──────────────┐
//! │   OutboxPublisher    │ ─────────────────────────────▶ │  MessageBus  │
//! └──────────────────────┘                                └──────────────┘
//!                                                     ┌──────────┼───────────┐
//!                                                     ▼          ▼           ▼
//!                                               InMemoryBus    LogBus    EmitterBus
//! ```

#[cfg(feature = "emitter")]
mod emitter;
mod in_memory;
mod log;
mod message_bus;

#[cfg(feature = "emitter")]
pub use emitter::EmitterBus;
pub use in_memory::InMemoryBus;
pub use log::LogBus;
pub use message_bus::{BusMessage, MessageBus, PublishError};
