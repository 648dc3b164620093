use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use super::schema;
use crate::employee::Employee;
use crate::outbox::{OutboxRecord, OutboxStatus};
use crate::repository::{
    EmployeeReader, OutboxStore, RepositoryError, Transactional, UnitOfWork,
};

const EMPLOYEE_COLUMNS: &str = "id, email, full_name, birthday, hobbies";
const OUTBOX_COLUMNS: &str =
    "id, aggregate_id, aggregate_type, event_type, payload, event_time, status";

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            let unique = code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
            if unique {
                let constraint = message
                    .as_deref()
                    .map(|m| m.trim_start_matches("UNIQUE constraint failed: "))
                    .unwrap_or("unique")
                    .to_string();
                return RepositoryError::UniqueViolation { constraint };
            }
        }
        RepositoryError::Database(err)
    }
}

/// Durable store backed by a single SQLite database.
///
/// Employees and outbox records share the database, so one SQLite
/// transaction covers a mutation and its outbox record. The connection is
/// serialized through a mutex; cloning shares it.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        tracing::info!(path = %path.as_ref().display(), "opened sqlite outbox store");
        Self::init(conn)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, RepositoryError> {
        schema::migrate(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

struct EmployeeRow {
    id: String,
    email: String,
    full_name: String,
    birthday: String,
    hobbies: String,
}

impl EmployeeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EmployeeRow {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            birthday: row.get(3)?,
            hobbies: row.get(4)?,
        })
    }

    fn into_employee(self) -> Result<Employee, RepositoryError> {
        Ok(Employee {
            id: parse_uuid("employees", &self.id)?,
            email: self.email,
            full_name: self.full_name,
            birthday: self
                .birthday
                .parse::<NaiveDate>()
                .map_err(|err| corrupt("employees", err))?,
            hobbies: serde_json::from_str(&self.hobbies)?,
        })
    }
}

struct OutboxRow {
    id: String,
    aggregate_id: String,
    aggregate_type: String,
    event_type: String,
    payload: String,
    event_time: String,
    status: String,
}

impl OutboxRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(OutboxRow {
            id: row.get(0)?,
            aggregate_id: row.get(1)?,
            aggregate_type: row.get(2)?,
            event_type: row.get(3)?,
            payload: row.get(4)?,
            event_time: row.get(5)?,
            status: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<OutboxRecord, RepositoryError> {
        Ok(OutboxRecord {
            id: parse_uuid("outbox", &self.id)?,
            aggregate_id: parse_uuid("outbox", &self.aggregate_id)?,
            aggregate_type: self.aggregate_type,
            event_type: self.event_type.parse()?,
            payload: self.payload,
            event_time: DateTime::parse_from_rfc3339(&self.event_time)
                .map_err(|err| corrupt("outbox", err))?
                .with_timezone(&Utc),
            status: self.status.parse()?,
        })
    }
}

fn parse_uuid(table: &'static str, value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|err| corrupt(table, err))
}

fn corrupt(table: &'static str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt {
        table,
        reason: err.to_string(),
    }
}

fn find_employee(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<Employee>, RepositoryError> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE {column} = ?1");
    conn.query_row(&sql, params![value], EmployeeRow::from_row)
        .optional()?
        .map(EmployeeRow::into_employee)
        .transpose()
}

fn query_outbox(
    conn: &Connection,
    filter: &str,
    value: Option<&str>,
) -> Result<Vec<OutboxRecord>, RepositoryError> {
    let sql = format!("SELECT {OUTBOX_COLUMNS} FROM outbox {filter} ORDER BY seq");
    let mut stmt = conn.prepare(&sql)?;
    let rows = match value {
        Some(value) => stmt
            .query_map(params![value], OutboxRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map([], OutboxRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    rows.into_iter().map(OutboxRow::into_record).collect()
}

struct SqliteUnitOfWork<'a> {
    conn: &'a Connection,
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        find_employee(self.conn, "id", &id.to_string())
    }

    fn employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        find_employee(self.conn, "email", email)
    }

    fn save_employee(&mut self, employee: &Employee) -> Result<(), RepositoryError> {
        let hobbies = serde_json::to_string(&employee.hobbies)?;
        self.conn.execute(
            "INSERT INTO employees (id, email, full_name, birthday, hobbies)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                 email = excluded.email,
                 full_name = excluded.full_name,
                 birthday = excluded.birthday,
                 hobbies = excluded.hobbies",
            params![
                employee.id.to_string(),
                employee.email,
                employee.full_name,
                employee.birthday.to_string(),
                hobbies,
            ],
        )?;
        Ok(())
    }

    fn delete_employee(&mut self, id: Uuid) -> Result<bool, RepositoryError> {
        let removed = self
            .conn
            .execute("DELETE FROM employees WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    fn insert_outbox(&mut self, record: &OutboxRecord) -> Result<(), RepositoryError> {
        self.conn.execute(
            "INSERT INTO outbox
                 (id, aggregate_id, aggregate_type, event_type, payload, event_time, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.aggregate_id.to_string(),
                record.aggregate_type,
                record.event_type.as_str(),
                record.payload,
                record.event_time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                record.status.as_str(),
            ],
        )?;
        Ok(())
    }
}

impl Transactional for SqliteStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("transaction"))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        // Dropping `tx` on the error path rolls back.
        let value = work(&mut SqliteUnitOfWork { conn: &tx })?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok(value)
    }
}

impl EmployeeReader for SqliteStore {
    fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        find_employee(&conn, "id", &id.to_string())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        let mut stmt =
            conn.prepare(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY email"))?;
        let rows = stmt
            .query_map([], EmployeeRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(EmployeeRow::into_employee).collect()
    }
}

impl OutboxStore for SqliteStore {
    fn outbox_by_status(
        &self,
        status: OutboxStatus,
    ) -> Result<Vec<OutboxRecord>, RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("outbox read"))?;
        query_outbox(&conn, "WHERE status = ?1", Some(status.as_str()))
    }

    fn outbox_records(&self) -> Result<Vec<OutboxRecord>, RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("outbox read"))?;
        query_outbox(&conn, "", None)
    }

    fn outbox_for_aggregate(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Vec<OutboxRecord>, RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("outbox read"))?;
        query_outbox(
            &conn,
            "WHERE aggregate_id = ?1",
            Some(&aggregate_id.to_string()),
        )
    }

    fn mark_processed(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("outbox write"))?;
        let updated = conn.execute(
            "UPDATE outbox SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![
                OutboxStatus::Processed.as_str(),
                id.to_string(),
                OutboxStatus::Pending.as_str(),
            ],
        )?;
        Ok(updated == 1)
    }
}
