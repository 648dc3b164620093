//! Transactional outbox for employee records.
//!
//! Every employee mutation made through [`EmployeeService`] writes an
//! [`OutboxRecord`] in the same store transaction. An [`OutboxPublisher`]
//! later forwards pending records to a [`MessageBus`] and flips each one to
//! processed once the bus accepted it, so delivery is at-least-once and
//! never lost to a crash between the write and the send.
//!
//! ```
//! use chrono::NaiveDate;
//! use outbox_relay::{
//!     EmployeeInput, EmployeeService, InMemoryBus, InMemoryStore, OutboxPublisher, OutboxStore,
//! };
//!
//! let store = InMemoryStore::new();
//! let service = EmployeeService::new(store.clone());
//! let birthday = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
//! service.create(EmployeeInput::new("ada@x.com", "Ada", birthday)).unwrap();
//!
//! let publisher = OutboxPublisher::new(store.clone(), InMemoryBus::new());
//! let report = publisher.run_publish_cycle().unwrap();
//! assert_eq!(report.published, 1);
//! assert!(store.outbox_pending().unwrap().is_empty());
//! ```

pub mod bus;
pub mod config;
mod employee;
#[cfg(feature = "http")]
pub mod http;
pub mod logging;
mod outbox;
mod publisher;
mod repository;
mod service;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "emitter")]
pub use bus::EmitterBus;
pub use bus::{BusMessage, InMemoryBus, LogBus, MessageBus, PublishError};
pub use config::{ConfigError, OutboxConfig};
pub use employee::{Employee, EmployeeInput, AGGREGATE_TYPE};
pub use outbox::{EmployeeEvent, EventType, OutboxRecord, OutboxStatus, PayloadError, UnknownTag};
pub use publisher::{
    CycleReport, FailurePolicy, OutboxPublisher, PublisherStats, PublisherThread, DEFAULT_TOPIC,
};
pub use repository::{
    EmployeeReader, InMemoryStore, OutboxStore, RepositoryError, Store, Transactional, UnitOfWork,
};
pub use service::{EmployeeService, ServiceError};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStore, SCHEMA_VERSION};
