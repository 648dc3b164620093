use thiserror::Error;

use crate::outbox::UnknownTag;

/// Storage-layer failure. Returning any of these from inside a transaction
/// rolls the whole transaction back.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository lock poisoned during {0}")]
    LockPoisoned(&'static str),

    /// A unique index rejected the write.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back into a record.
    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::UniqueViolation { .. })
    }

    /// Whether this is a unique violation on the named constraint
    /// (`table.column`).
    pub fn violates(&self, name: &str) -> bool {
        matches!(self, RepositoryError::UniqueViolation { constraint } if constraint == name)
    }
}

impl From<UnknownTag> for RepositoryError {
    fn from(err: UnknownTag) -> Self {
        RepositoryError::Corrupt {
            table: "outbox",
            reason: err.to_string(),
        }
    }
}
