use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::employee::AGGREGATE_TYPE;

use super::event::EmployeeEvent;

/// Delivery status of an outbox record. `Pending` is the only initial state
/// and `Processed` is terminal.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    #[default]
    Pending,
    Processed,
}

/// Kind of mutation an outbox record describes.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

/// Returned when a stored status or event type tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Processed => "PROCESSED",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(OutboxStatus::Pending),
            "PROCESSED" => Ok(OutboxStatus::Processed),
            other => Err(UnknownTag {
                kind: "outbox status",
                value: other.to_string(),
            }),
        }
    }
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "CREATED",
            EventType::Updated => "UPDATED",
            EventType::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CREATED" => Ok(EventType::Created),
            "UPDATED" => Ok(EventType::Updated),
            "DELETED" => Ok(EventType::Deleted),
            other => Err(UnknownTag {
                kind: "event type",
                value: other.to_string(),
            }),
        }
    }
}

/// Durable intent to publish one employee mutation via the outbox pattern.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub event_type: EventType,
    pub payload: String,
    pub event_time: DateTime<Utc>,
    pub status: OutboxStatus,
}

impl OutboxRecord {
    /// New pending record for an employee mutation. The payload is the
    /// serialized [`EmployeeEvent`] for `(aggregate_id, event_type)`.
    pub fn pending(aggregate_id: Uuid, event_type: EventType) -> Self {
        OutboxRecord {
            id: Uuid::new_v4(),
            aggregate_id,
            aggregate_type: AGGREGATE_TYPE.to_string(),
            event_type,
            payload: EmployeeEvent::new(aggregate_id, event_type).to_payload(),
            event_time: Utc::now(),
            status: OutboxStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_processed(&self) -> bool {
        self.status == OutboxStatus::Processed
    }

    /// Flip `Pending` to `Processed`. Returns `false` if the record was
    /// already processed; the transition never reverts.
    pub fn mark_processed(&mut self) -> bool {
        if self.is_pending() {
            self.status = OutboxStatus::Processed;
            true
        } else {
            false
        }
    }
}
