//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use outbox_relay::{
    Employee, EmployeeInput, EmployeeReader, InMemoryBus, InMemoryStore, MessageBus,
    OutboxRecord, OutboxStatus, OutboxStore, PublishError, RepositoryError, Transactional,
    UnitOfWork,
};
use uuid::Uuid;

pub fn birthday() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
}

pub fn input(email: &str) -> EmployeeInput {
    EmployeeInput::new(email, "Test Employee", birthday()).with_hobbies(["Reading", "Hiking"])
}

/// Bus that can be told to fail. Accepted messages land in `delivered`.
#[derive(Clone, Default)]
pub struct FlakyBus {
    pub delivered: InMemoryBus,
    failing: Arc<Mutex<Vec<String>>>,
    down: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl FlakyBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every payload containing `needle`, e.g. an aggregate id.
    pub fn fail_payloads_containing(&self, needle: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(needle.into());
    }

    /// Reject everything until healed.
    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.down.store(false, Ordering::SeqCst);
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Sends attempted, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MessageBus for FlakyBus {
    fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(PublishError::ConnectionFailed("broker unreachable".into()));
        }
        let rejected = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|needle| payload.contains(needle.as_str()));
        if rejected {
            return Err(PublishError::Rejected(format!("refused {payload}")));
        }
        self.delivered.send(topic, payload)
    }
}

/// In-memory store whose status flip always fails, as if the database went
/// away right after the bus accepted a message.
#[derive(Clone, Default)]
pub struct FlipFailsStore {
    pub inner: InMemoryStore,
}

impl Transactional for FlipFailsStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner.transaction(work)
    }
}

impl EmployeeReader for FlipFailsStore {
    fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        self.inner.get_employee(id)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.inner.list_employees()
    }
}

impl OutboxStore for FlipFailsStore {
    fn outbox_by_status(
        &self,
        status: OutboxStatus,
    ) -> Result<Vec<OutboxRecord>, RepositoryError> {
        self.inner.outbox_by_status(status)
    }

    fn outbox_records(&self) -> Result<Vec<OutboxRecord>, RepositoryError> {
        self.inner.outbox_records()
    }

    fn mark_processed(&self, _id: Uuid) -> Result<bool, RepositoryError> {
        Err(RepositoryError::LockPoisoned("outbox write"))
    }
}
