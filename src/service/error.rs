//! Errors surfaced by the write boundary.

use thiserror::Error;
use uuid::Uuid;

use crate::repository::RepositoryError;

/// Error returned by [`EmployeeService`](super::EmployeeService) operations.
///
/// `Conflict` and `NotFound` are precise, local conditions; nothing was
/// committed when either is returned. `Storage` wraps any store failure,
/// which also rolled back the enclosing transaction.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Another live employee already holds this email.
    #[error("Email {email} already exists!")]
    Conflict { email: String },

    /// An update tried to take an email held by another employee.
    #[error("Email {email} already exists for a different employee!")]
    EmailTaken { email: String },

    /// No employee with this id.
    #[error("Employee with ID {id} not found.")]
    NotFound { id: Uuid },

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl ServiceError {
    /// HTTP-style status code for the CRUD boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Conflict { .. } | ServiceError::EmailTaken { .. } => 400,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Storage(_) => 500,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Conflict { .. } | ServiceError::EmailTaken { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}
