//! Relay from the outbox table to the message bus.
//!
//! [`OutboxPublisher`] runs a single cycle on demand; [`PublisherThread`]
//! repeats it on a fixed delay in the background.

mod cycle;
mod thread;

pub use cycle::{CycleReport, FailurePolicy, OutboxPublisher, DEFAULT_TOPIC};
pub use thread::{PublisherStats, PublisherThread};
