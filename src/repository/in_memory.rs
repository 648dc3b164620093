use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::error::RepositoryError;
use super::repository::{EmployeeReader, OutboxStore, Transactional, UnitOfWork};
use crate::employee::Employee;
use crate::outbox::{OutboxRecord, OutboxStatus};

const EMAIL_CONSTRAINT: &str = "employees.email";

#[derive(Default)]
struct Tables {
    employees: HashMap<Uuid, Employee>,
    /// Unique index: email -> employee id.
    emails: HashMap<String, Uuid>,
    /// Append-only log in insertion order.
    outbox: Vec<OutboxRecord>,
    outbox_ids: HashMap<Uuid, usize>,
    /// Status index: positions in `outbox` that are still pending.
    pending: BTreeSet<usize>,
}

/// Changes buffered by a unit of work until commit.
#[derive(Default)]
struct Changes {
    /// `None` marks a deletion.
    employees: HashMap<Uuid, Option<Employee>>,
    outbox: Vec<OutboxRecord>,
}

impl Tables {
    fn apply(&mut self, changes: Changes) -> Result<(), RepositoryError> {
        let released: HashSet<&str> = changes
            .employees
            .keys()
            .filter_map(|id| self.employees.get(id))
            .map(|employee| employee.email.as_str())
            .collect();

        for employee in changes.employees.values().flatten() {
            if let Some(owner) = self.emails.get(&employee.email) {
                if *owner != employee.id && !released.contains(employee.email.as_str()) {
                    return Err(RepositoryError::UniqueViolation {
                        constraint: EMAIL_CONSTRAINT.to_string(),
                    });
                }
            }
        }
        for record in &changes.outbox {
            if self.outbox_ids.contains_key(&record.id) {
                return Err(RepositoryError::UniqueViolation {
                    constraint: "outbox.id".to_string(),
                });
            }
        }

        for id in changes.employees.keys() {
            if let Some(previous) = self.employees.remove(id) {
                self.emails.remove(&previous.email);
            }
        }
        for employee in changes.employees.into_values().flatten() {
            self.emails.insert(employee.email.clone(), employee.id);
            self.employees.insert(employee.id, employee);
        }
        for record in changes.outbox {
            let position = self.outbox.len();
            if record.is_pending() {
                self.pending.insert(position);
            }
            self.outbox_ids.insert(record.id, position);
            self.outbox.push(record);
        }

        Ok(())
    }
}

/// In-memory store keeping employees and the outbox behind one `RwLock`, so
/// a transaction covers both tables.
///
/// Cloning creates another handle to the same storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemoryUnitOfWork<'a> {
    base: &'a Tables,
    changes: Changes,
}

impl UnitOfWork for InMemoryUnitOfWork<'_> {
    fn employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        if let Some(staged) = self.changes.employees.get(&id) {
            return Ok(staged.clone());
        }
        Ok(self.base.employees.get(&id).cloned())
    }

    fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        let staged = self
            .changes
            .employees
            .values()
            .flatten()
            .find(|employee| employee.email == email);
        if let Some(employee) = staged {
            return Ok(Some(employee.clone()));
        }

        let committed = self
            .base
            .emails
            .get(email)
            .filter(|id| !self.changes.employees.contains_key(id))
            .and_then(|id| self.base.employees.get(id))
            .cloned();
        Ok(committed)
    }

    fn save_employee(&mut self, employee: &Employee) -> Result<(), RepositoryError> {
        if let Some(holder) = self.employee_by_email(&employee.email)? {
            if holder.id != employee.id {
                return Err(RepositoryError::UniqueViolation {
                    constraint: EMAIL_CONSTRAINT.to_string(),
                });
            }
        }
        self.changes
            .employees
            .insert(employee.id, Some(employee.clone()));
        Ok(())
    }

    fn delete_employee(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let existed = self.employee(id)?.is_some();
        if existed {
            self.changes.employees.insert(id, None);
        }
        Ok(existed)
    }

    fn insert_outbox(&mut self, record: &OutboxRecord) -> Result<(), RepositoryError> {
        self.changes.outbox.push(record.clone());
        Ok(())
    }
}

impl Transactional for InMemoryStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("transaction"))?;

        let mut unit = InMemoryUnitOfWork {
            base: &*tables,
            changes: Changes::default(),
        };
        let value = work(&mut unit)?;
        let changes = unit.changes;

        tables.apply(changes)?;
        Ok(value)
    }
}

impl EmployeeReader for InMemoryStore {
    fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        Ok(tables.employees.get(&id).cloned())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        let mut employees: Vec<Employee> = tables.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(employees)
    }
}

impl OutboxStore for InMemoryStore {
    fn outbox_by_status(
        &self,
        status: OutboxStatus,
    ) -> Result<Vec<OutboxRecord>, RepositoryError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("outbox read"))?;

        let records = match status {
            OutboxStatus::Pending => tables
                .pending
                .iter()
                .map(|position| tables.outbox[*position].clone())
                .collect(),
            OutboxStatus::Processed => tables
                .outbox
                .iter()
                .filter(|record| record.is_processed())
                .cloned()
                .collect(),
        };
        Ok(records)
    }

    fn outbox_records(&self) -> Result<Vec<OutboxRecord>, RepositoryError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("outbox read"))?;
        Ok(tables.outbox.clone())
    }

    fn mark_processed(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("outbox write"))?;

        let Some(position) = tables.outbox_ids.get(&id).copied() else {
            return Ok(false);
        };
        let flipped = tables.outbox[position].mark_processed();
        if flipped {
            tables.pending.remove(&position);
        }
        Ok(flipped)
    }
}
