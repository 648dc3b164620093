use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::EventType;

/// Body handed to the bus for every employee mutation.
///
/// The wire form is a flat key-value string:
///
/// ```text
/// EmployeeEvent[id=6f1c…, type=CREATED]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed employee event payload: {0}")]
pub struct PayloadError(pub String);

const PREFIX: &str = "EmployeeEvent[";
const SUFFIX: &str = "]";

impl EmployeeEvent {
    pub fn new(id: Uuid, event_type: EventType) -> Self {
        EmployeeEvent { id, event_type }
    }

    pub fn to_payload(&self) -> String {
        self.to_string()
    }

    /// Read a payload produced by [`EmployeeEvent::to_payload`]. Field order
    /// is not significant.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        let body = payload
            .trim()
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(SUFFIX))
            .ok_or_else(|| PayloadError(payload.to_string()))?;

        let mut id = None;
        let mut event_type = None;
        for pair in body.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| PayloadError(payload.to_string()))?;
            match key.trim() {
                "id" => {
                    id = Some(
                        Uuid::parse_str(value.trim())
                            .map_err(|err| PayloadError(err.to_string()))?,
                    )
                }
                "type" => {
                    event_type = Some(
                        value
                            .trim()
                            .parse::<EventType>()
                            .map_err(|err| PayloadError(err.to_string()))?,
                    )
                }
                _ => {}
            }
        }

        match (id, event_type) {
            (Some(id), Some(event_type)) => Ok(EmployeeEvent { id, event_type }),
            _ => Err(PayloadError(payload.to_string())),
        }
    }
}

impl fmt::Display for EmployeeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}id={}, type={}{}", PREFIX, self.id, self.event_type, SUFFIX)
    }
}
