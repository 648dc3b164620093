//! Store abstractions and the in-memory store.
//!
//! Employees and outbox records must live in the same transactional
//! resource: [`Transactional::transaction`] commits a mutation and its
//! outbox record together or not at all.

mod error;
mod in_memory;
mod repository;

pub use error::RepositoryError;
pub use in_memory::InMemoryStore;
pub use repository::{EmployeeReader, OutboxStore, Store, Transactional, UnitOfWork};
