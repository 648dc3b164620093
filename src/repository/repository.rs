use uuid::Uuid;

use super::error::RepositoryError;
use crate::employee::Employee;
use crate::outbox::{OutboxRecord, OutboxStatus};

/// Reads and writes visible inside one transaction.
///
/// Writes are only observable by other callers once the surrounding
/// [`Transactional::transaction`] commits.
pub trait UnitOfWork {
    fn employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError>;

    fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError>;

    /// Insert or overwrite an employee. Fails with
    /// [`RepositoryError::UniqueViolation`] when another employee holds the email.
    fn save_employee(&mut self, employee: &Employee) -> Result<(), RepositoryError>;

    /// Remove an employee, returning whether it existed.
    fn delete_employee(&mut self, id: Uuid) -> Result<bool, RepositoryError>;

    fn insert_outbox(&mut self, record: &OutboxRecord) -> Result<(), RepositoryError>;
}

/// Run work as one atomic unit: everything commits, or nothing does.
pub trait Transactional {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Plain employee reads outside any transaction.
pub trait EmployeeReader {
    fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError>;

    /// All live employees ordered by email.
    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError>;
}

/// Outbox queries and the single status transition the publisher performs.
pub trait OutboxStore {
    /// Records with the given status, in insertion order.
    fn outbox_by_status(&self, status: OutboxStatus)
        -> Result<Vec<OutboxRecord>, RepositoryError>;

    fn outbox_pending(&self) -> Result<Vec<OutboxRecord>, RepositoryError> {
        self.outbox_by_status(OutboxStatus::Pending)
    }

    /// Every record ever written, in insertion order.
    fn outbox_records(&self) -> Result<Vec<OutboxRecord>, RepositoryError>;

    fn outbox_for_aggregate(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Vec<OutboxRecord>, RepositoryError> {
        Ok(self
            .outbox_records()?
            .into_iter()
            .filter(|record| record.aggregate_id == aggregate_id)
            .collect())
    }

    /// Flip one record from pending to processed in its own transaction.
    /// Returns `false` when the record is unknown or already processed.
    fn mark_processed(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

/// Full store: transactional writes, employee reads and outbox access over
/// one shared resource.
pub trait Store: Transactional + EmployeeReader + OutboxStore + Send + Sync {}

impl<T> Store for T where T: Transactional + EmployeeReader + OutboxStore + Send + Sync {}
