//! Write coordinator for employee records.
//!
//! [`EmployeeService`] is the write boundary consumed by the CRUD layer.
//! `create`, `update` and `delete` each run in one store transaction that
//! also appends the matching outbox record; `get` and `list` are plain reads.

mod employee_service;
mod error;

pub use employee_service::EmployeeService;
pub use error::ServiceError;
