use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bus::MessageBus;
use crate::repository::{RepositoryError, Store};

/// Topic every employee event is sent to unless configured otherwise.
pub const DEFAULT_TOPIC: &str = "employee-events";

/// What a cycle does after a failed send.
///
/// Either way the failed record stays pending for the next cycle and
/// records already flipped earlier in the cycle stay processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going, but skip later records of the same aggregate so its
    /// events never overtake each other.
    #[default]
    Continue,
    /// Stop the cycle at the first failure.
    HaltCycle,
}

/// Outcome of one publish cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Pending records read at the start of the cycle.
    pub fetched: usize,
    /// Sent and flipped to processed.
    pub published: usize,
    /// Send failed; still pending.
    pub failed: usize,
    /// Not attempted because an earlier record of the same aggregate failed.
    pub skipped: usize,
    /// The stop flag was raised before every record was attempted.
    pub cancelled: bool,
}

/// Forwards pending outbox records to a [`MessageBus`] and marks each one
/// processed once the bus accepted it.
///
/// Each record's send and status flip is its own unit: a failure never
/// undoes earlier successes in the same cycle.
pub struct OutboxPublisher<S, B> {
    store: S,
    bus: B,
    topic: String,
    policy: FailurePolicy,
    batch_size: Option<usize>,
}

impl<S, B> OutboxPublisher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            topic: DEFAULT_TOPIC.to_string(),
            policy: FailurePolicy::default(),
            batch_size: None,
        }
    }

    /// Set the topic records are sent to.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap the number of send attempts per cycle. The rest wait for the
    /// next cycle.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S: Store, B: MessageBus> OutboxPublisher<S, B> {
    /// Run one cycle over the records pending right now. Records inserted
    /// while the cycle runs are left for the next one.
    ///
    /// Only store failures are returned; bus failures are logged, counted
    /// and retried on the next cycle.
    pub fn run_publish_cycle(&self) -> Result<CycleReport, RepositoryError> {
        self.run_publish_cycle_until(&AtomicBool::new(false))
    }

    /// Like [`run_publish_cycle`](Self::run_publish_cycle), checking `stop`
    /// between records. A record is only flipped after a confirmed send.
    pub fn run_publish_cycle_until(
        &self,
        stop: &AtomicBool,
    ) -> Result<CycleReport, RepositoryError> {
        let pending = self.store.outbox_pending()?;
        let mut report = CycleReport {
            fetched: pending.len(),
            ..CycleReport::default()
        };
        let limit = self.batch_size.unwrap_or(usize::MAX);
        let mut blocked: HashSet<Uuid> = HashSet::new();

        for record in pending {
            if stop.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            if report.published + report.failed >= limit {
                break;
            }
            if blocked.contains(&record.aggregate_id) {
                report.skipped += 1;
                continue;
            }

            match self.bus.send(&self.topic, &record.payload) {
                Ok(()) => {
                    let flipped = self.store.mark_processed(record.id).map_err(|err| {
                        error!(outbox_id = %record.id, error = %err, "sent but could not mark processed");
                        err
                    })?;
                    if !flipped {
                        debug!(outbox_id = %record.id, "record was already processed");
                    }
                    report.published += 1;
                }
                Err(err) => {
                    warn!(
                        outbox_id = %record.id,
                        aggregate_id = %record.aggregate_id,
                        event_type = %record.event_type,
                        topic = %self.topic,
                        error = %err,
                        "publish failed, will retry next cycle"
                    );
                    report.failed += 1;
                    match self.policy {
                        FailurePolicy::HaltCycle => break,
                        FailurePolicy::Continue => {
                            blocked.insert(record.aggregate_id);
                        }
                    }
                }
            }
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                published = report.published,
                failed = report.failed,
                skipped = report.skipped,
                cancelled = report.cancelled,
                "publish cycle finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InMemoryBus, PublishError};
    use crate::outbox::{EventType, OutboxRecord, OutboxStatus};
    use crate::repository::{InMemoryStore, OutboxStore, Transactional};
    use std::sync::Arc;

    /// Fails every send whose payload mentions one of the given aggregates.
    struct FailFor {
        inner: InMemoryBus,
        aggregates: Vec<Uuid>,
    }

    impl MessageBus for FailFor {
        fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
            if self.aggregates.iter().any(|id| payload.contains(&id.to_string())) {
                return Err(PublishError::Timeout);
            }
            self.inner.send(topic, payload)
        }
    }

    fn insert(store: &InMemoryStore, aggregate_id: Uuid, event_type: EventType) -> Uuid {
        let record = OutboxRecord::pending(aggregate_id, event_type);
        let id = record.id;
        store
            .transaction(|unit| unit.insert_outbox(&record))
            .unwrap();
        id
    }

    #[test]
    fn publisher_builder() {
        let publisher = OutboxPublisher::new(InMemoryStore::new(), InMemoryBus::new())
            .with_topic("audit")
            .with_failure_policy(FailurePolicy::HaltCycle)
            .with_batch_size(5);

        assert_eq!(publisher.topic(), "audit");
        assert_eq!(publisher.policy, FailurePolicy::HaltCycle);
        assert_eq!(publisher.batch_size, Some(5));
    }

    #[test]
    fn empty_cycle_is_a_noop() {
        let publisher = OutboxPublisher::new(InMemoryStore::new(), InMemoryBus::new());
        assert_eq!(publisher.run_publish_cycle().unwrap(), CycleReport::default());
        assert!(publisher.bus().is_empty());
    }

    #[test]
    fn sends_in_store_order_and_flips() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        insert(&store, a, EventType::Created);
        insert(&store, a, EventType::Updated);

        let publisher = OutboxPublisher::new(store.clone(), InMemoryBus::new());
        let report = publisher.run_publish_cycle().unwrap();

        assert_eq!(report.published, 2);
        assert!(store.outbox_pending().unwrap().is_empty());
        let payloads = publisher.bus().payloads_on(DEFAULT_TOPIC);
        assert!(payloads[0].contains("CREATED"));
        assert!(payloads[1].contains("UPDATED"));

        // Nothing left: a second cycle sends nothing.
        assert_eq!(publisher.run_publish_cycle().unwrap().fetched, 0);
        assert_eq!(publisher.bus().len(), 2);
    }

    #[test]
    fn continue_policy_skips_rest_of_failed_aggregate() {
        let store = InMemoryStore::new();
        let bad = Uuid::new_v4();
        let good = Uuid::new_v4();
        let bad_created = insert(&store, bad, EventType::Created);
        let good_created = insert(&store, good, EventType::Created);
        let bad_updated = insert(&store, bad, EventType::Updated);

        let bus = FailFor {
            inner: InMemoryBus::new(),
            aggregates: vec![bad],
        };
        let publisher = OutboxPublisher::new(store.clone(), bus);
        let report = publisher.run_publish_cycle().unwrap();

        assert_eq!(
            report,
            CycleReport {
                fetched: 3,
                published: 1,
                failed: 1,
                skipped: 1,
                cancelled: false
            }
        );
        let pending: Vec<Uuid> = store.outbox_pending().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(pending, vec![bad_created, bad_updated]);
        let processed = store.outbox_by_status(OutboxStatus::Processed).unwrap();
        assert_eq!(processed[0].id, good_created);
    }

    #[test]
    fn halt_policy_stops_at_first_failure() {
        let store = InMemoryStore::new();
        let first = Uuid::new_v4();
        let bad = Uuid::new_v4();
        let last = Uuid::new_v4();
        insert(&store, first, EventType::Created);
        insert(&store, bad, EventType::Created);
        insert(&store, last, EventType::Created);

        let bus = FailFor {
            inner: InMemoryBus::new(),
            aggregates: vec![bad],
        };
        let publisher = OutboxPublisher::new(store.clone(), bus)
            .with_failure_policy(FailurePolicy::HaltCycle);
        let report = publisher.run_publish_cycle().unwrap();

        assert_eq!(report.published, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(store.outbox_pending().unwrap().len(), 2);
        assert_eq!(publisher.bus().inner.len(), 1);
    }

    #[test]
    fn batch_size_limits_attempts() {
        let store = InMemoryStore::new();
        for _ in 0..5 {
            insert(&store, Uuid::new_v4(), EventType::Created);
        }
        let publisher =
            OutboxPublisher::new(store.clone(), InMemoryBus::new()).with_batch_size(2);

        assert_eq!(publisher.run_publish_cycle().unwrap().published, 2);
        assert_eq!(store.outbox_pending().unwrap().len(), 3);
        assert_eq!(publisher.run_publish_cycle().unwrap().published, 2);
        assert_eq!(publisher.run_publish_cycle().unwrap().published, 1);
        assert!(store.outbox_pending().unwrap().is_empty());
    }

    /// Raises the shared stop flag while delivering its first message.
    struct StopsDuringSend {
        inner: InMemoryBus,
        stop: Arc<AtomicBool>,
    }

    impl MessageBus for StopsDuringSend {
        fn send(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
            self.stop.store(true, Ordering::SeqCst);
            self.inner.send(topic, payload)
        }
    }

    #[test]
    fn stop_raised_mid_cycle_keeps_rest_pending() {
        let store = InMemoryStore::new();
        let first = insert(&store, Uuid::new_v4(), EventType::Created);
        let second = insert(&store, Uuid::new_v4(), EventType::Created);
        let third = insert(&store, Uuid::new_v4(), EventType::Created);

        let stop = Arc::new(AtomicBool::new(false));
        let bus = StopsDuringSend {
            inner: InMemoryBus::new(),
            stop: Arc::clone(&stop),
        };
        let publisher = OutboxPublisher::new(store.clone(), bus);
        let report = publisher.run_publish_cycle_until(&stop).unwrap();

        assert_eq!(
            report,
            CycleReport {
                fetched: 3,
                published: 1,
                failed: 0,
                skipped: 0,
                cancelled: true
            }
        );
        // The in-flight send completed and was flipped; nothing after it ran.
        let processed: Vec<Uuid> = store
            .outbox_by_status(OutboxStatus::Processed)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(processed, vec![first]);
        let pending: Vec<Uuid> = store.outbox_pending().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(pending, vec![second, third]);
        assert_eq!(publisher.bus().inner.len(), 1);
    }

    #[test]
    fn raised_stop_flag_sends_nothing() {
        let store = InMemoryStore::new();
        insert(&store, Uuid::new_v4(), EventType::Created);
        let publisher = OutboxPublisher::new(store.clone(), InMemoryBus::new());

        let report = publisher
            .run_publish_cycle_until(&AtomicBool::new(true))
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.published, 0);
        assert_eq!(store.outbox_pending().unwrap().len(), 1);
        assert!(publisher.bus().is_empty());
    }
}
