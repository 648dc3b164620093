//! Background thread that runs publish cycles at a fixed delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::bus::MessageBus;
use crate::repository::Store;

use super::cycle::{CycleReport, OutboxPublisher};

/// Totals accumulated by a [`PublisherThread`] over its lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublisherStats {
    pub cycles: usize,
    pub messages_published: usize,
    pub messages_failed: usize,
    pub messages_skipped: usize,
    /// Cycles that ended early on a store error.
    pub cycle_errors: usize,
}

impl PublisherStats {
    fn absorb(&mut self, report: &CycleReport) {
        self.messages_published += report.published;
        self.messages_failed += report.failed;
        self.messages_skipped += report.skipped;
    }
}

/// Runs [`OutboxPublisher::run_publish_cycle_until`] in a loop, waiting
/// `interval` after each cycle finishes before starting the next, so
/// cycles from one thread never overlap.
///
/// ```
/// use std::time::Duration;
/// use outbox_relay::{InMemoryBus, InMemoryStore, OutboxPublisher, PublisherThread};
///
/// let publisher = OutboxPublisher::new(InMemoryStore::new(), InMemoryBus::new());
/// let worker = PublisherThread::spawn(publisher, Duration::from_millis(20));
///
/// let stats = worker.stop();
/// assert_eq!(stats.messages_failed, 0);
/// ```
pub struct PublisherThread {
    stop_tx: Sender<()>,
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<PublisherStats>>,
}

impl PublisherThread {
    /// Start the loop. The first cycle runs immediately.
    pub fn spawn<S, B>(publisher: OutboxPublisher<S, B>, interval: Duration) -> Self
    where
        S: Store + 'static,
        B: MessageBus + 'static,
    {
        let (stop_tx, stop_rx) = channel();
        let stopping = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopping);

        info!(
            topic = publisher.topic(),
            interval_ms = interval.as_millis() as u64,
            "outbox publisher started"
        );

        let handle = thread::spawn(move || {
            let mut stats = PublisherStats::default();

            loop {
                if flag.load(Ordering::SeqCst) {
                    break;
                }

                stats.cycles += 1;
                match publisher.run_publish_cycle_until(&flag) {
                    Ok(report) => stats.absorb(&report),
                    Err(err) => {
                        stats.cycle_errors += 1;
                        error!(error = %err, "publish cycle aborted");
                    }
                }

                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }

            info!(
                cycles = stats.cycles,
                published = stats.messages_published,
                failed = stats.messages_failed,
                "outbox publisher stopped"
            );
            stats
        });

        Self {
            stop_tx,
            stopping,
            handle: Some(handle),
        }
    }

    /// Signal the loop to stop and wait for the running cycle to finish
    /// its current record. A thread that died from a panic is logged at
    /// `error` and yields empty stats.
    pub fn stop(mut self) -> PublisherStats {
        self.signal_stop();
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(stats) => stats,
                Err(_) => {
                    error!("outbox publisher thread panicked, its stats are lost");
                    PublisherStats::default()
                }
            },
            None => PublisherStats::default(),
        }
    }

    /// Signal the loop to stop without waiting.
    pub fn signal_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PublisherThread {
    fn drop(&mut self) {
        // The thread finishes on its own; dropping never blocks.
        self.signal_stop();
    }
}
