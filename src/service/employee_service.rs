//! The write coordinator: each employee mutation and its outbox record are
//! committed in one store transaction.

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::ServiceError;
use crate::employee::{Employee, EmployeeInput};
use crate::outbox::{EventType, OutboxRecord};
use crate::repository::{Store, UnitOfWork};

const EMAIL_CONSTRAINT: &str = "employees.email";

/// Employee CRUD over a [`Store`], appending exactly one pending outbox
/// record per successful mutation.
///
/// ```
/// use chrono::NaiveDate;
/// use outbox_relay::{EmployeeInput, EmployeeService, InMemoryStore, OutboxStore};
///
/// let service = EmployeeService::new(InMemoryStore::new());
/// let ada = service
///     .create(EmployeeInput::new("ada@x.com", "Ada", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()))
///     .unwrap();
///
/// let pending = service.store().outbox_pending().unwrap();
/// assert_eq!(pending[0].aggregate_id, ada.id);
/// ```
pub struct EmployeeService<S> {
    store: S,
}

impl<S: Store> EmployeeService<S> {
    pub fn new(store: S) -> Self {
        EmployeeService { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a new employee and a `CREATED` outbox record.
    ///
    /// Fails with [`ServiceError::Conflict`] when the email is taken.
    pub fn create(&self, input: EmployeeInput) -> Result<Employee, ServiceError> {
        let email = input.email.clone();
        let result = self.store.transaction(|unit| {
            if unit.employee_by_email(&input.email)?.is_some() {
                return Err(ServiceError::Conflict {
                    email: input.email.clone(),
                });
            }

            let employee = Employee::create(input);
            unit.save_employee(&employee)?;
            append_event(unit, employee.id, EventType::Created)?;
            Ok(employee)
        });

        let employee = result.map_err(|err| {
            conflict_on_unique(err, email, |email| ServiceError::Conflict { email })
        })?;
        debug!(aggregate_id = %employee.id, event_type = "CREATED", "employee created");
        Ok(employee)
    }

    /// Overwrite every mutable field of an existing employee and append an
    /// `UPDATED` outbox record. Keeping the current email is not a conflict;
    /// taking another employee's fails with [`ServiceError::EmailTaken`].
    pub fn update(&self, id: Uuid, input: EmployeeInput) -> Result<Employee, ServiceError> {
        let email = input.email.clone();
        let result = self.store.transaction(|unit| {
            if let Some(holder) = unit.employee_by_email(&input.email)? {
                if holder.id != id {
                    return Err(ServiceError::EmailTaken {
                        email: input.email.clone(),
                    });
                }
            }

            let mut employee = unit.employee(id)?.ok_or(ServiceError::NotFound { id })?;
            employee.apply(input);
            unit.save_employee(&employee)?;
            append_event(unit, id, EventType::Updated)?;
            Ok(employee)
        });

        let employee = result.map_err(|err| {
            conflict_on_unique(err, email, |email| ServiceError::EmailTaken { email })
        })?;
        debug!(aggregate_id = %id, event_type = "UPDATED", "employee updated");
        Ok(employee)
    }

    /// Remove an employee and append a `DELETED` outbox record referencing
    /// its id.
    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store
            .transaction(|unit| {
                if !unit.delete_employee(id)? {
                    return Err(ServiceError::NotFound { id });
                }
                append_event(unit, id, EventType::Deleted)
            })
            .map_err(log_rejection)?;

        debug!(aggregate_id = %id, event_type = "DELETED", "employee deleted");
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<Employee, ServiceError> {
        self.store
            .get_employee(id)?
            .ok_or(ServiceError::NotFound { id })
    }

    pub fn list(&self) -> Result<Vec<Employee>, ServiceError> {
        Ok(self.store.list_employees()?)
    }
}

fn append_event(
    unit: &mut dyn UnitOfWork,
    aggregate_id: Uuid,
    event_type: EventType,
) -> Result<(), ServiceError> {
    let record = OutboxRecord::pending(aggregate_id, event_type);
    unit.insert_outbox(&record)?;
    debug!(outbox_id = %record.id, %aggregate_id, %event_type, "outbox record staged");
    Ok(())
}

/// A unique-index failure at commit means another writer took the email
/// between our check and our write.
fn conflict_on_unique(
    err: ServiceError,
    email: String,
    conflict: impl FnOnce(String) -> ServiceError,
) -> ServiceError {
    let err = match err {
        ServiceError::Storage(inner) if inner.violates(EMAIL_CONSTRAINT) => conflict(email),
        other => other,
    };
    log_rejection(err)
}

fn log_rejection(err: ServiceError) -> ServiceError {
    match &err {
        ServiceError::Conflict { email } | ServiceError::EmailTaken { email } => {
            warn!(%email, "rejected: email already in use")
        }
        ServiceError::NotFound { id } => warn!(%id, "rejected: employee not found"),
        ServiceError::Storage(inner) => warn!(error = %inner, "write rolled back"),
    }
    err
}
