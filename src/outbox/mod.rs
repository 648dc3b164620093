//! Outbox records and the event payload they carry.
//!
//! An [`OutboxRecord`] is written in the same store transaction as the
//! employee mutation it describes and later flipped to
//! [`OutboxStatus::Processed`] by the publisher once the bus accepted it.

mod event;
mod record;

pub use event::{EmployeeEvent, PayloadError};
pub use record::{EventType, OutboxRecord, OutboxStatus, UnknownTag};
