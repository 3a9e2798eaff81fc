//! Tag inventory pipeline
//!
//! Tag reports arrive from the device link on its own threads, in batches and
//! at high rate. The ingestion observer only enqueues identifiers; a single
//! consumer task per session owns the seen set, emits one `TagDiscovered` per
//! new identifier and a final `InventoryFinished` once the channel is closed
//! and drained.

use super::events::{EventBus, ReaderEvent};
use crate::device::{DeviceEvent, DeviceLink, DeviceObserver, EventSource};
use crate::error::{ReaderError, ReaderResult};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Lifecycle of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryState {
    Idle,
    Running,
}

/// Read counters, cumulative across sessions
#[derive(Debug, Default)]
struct IngestionStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Write side of a session's ingestion channel
///
/// The sender is taken out on close, which ends the consumer's stream once
/// the buffered identifiers are drained.
struct IngestionGate {
    run_id: Uuid,
    accepting: AtomicBool,
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    stats: Arc<IngestionStats>,
}

impl IngestionGate {
    fn offer(&self, epc: String) -> bool {
        let sender = self.sender.lock();
        let delivered = match sender.as_ref() {
            Some(tx) if self.accepting.load(Ordering::SeqCst) => tx.send(epc).is_ok(),
            _ => false,
        };
        let counter = if delivered {
            &self.stats.accepted
        } else {
            &self.stats.rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
        delivered
    }

    fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.sender.lock().take();
    }
}

/// Observer registered for [`EventSource::TagsReported`] while a session runs
pub struct TagReportObserver {
    reader: String,
    gate: Arc<IngestionGate>,
}

impl DeviceObserver for TagReportObserver {
    fn on_event(&self, event: DeviceEvent) {
        let DeviceEvent::TagsReported(reads) = event else {
            return;
        };
        for read in reads {
            let epc = read.epc;
            if !self.gate.offer(epc.clone()) {
                warn!(
                    reader = %self.reader,
                    run_id = %self.gate.run_id,
                    epc = %epc,
                    "Dropping tag read, inventory session is no longer accepting"
                );
            }
        }
    }
}

struct ActiveSession {
    run_id: Uuid,
    gate: Arc<IngestionGate>,
}

pub struct InventoryPipeline {
    reader: String,
    events: Arc<EventBus>,
    session: Mutex<Option<ActiveSession>>,
    consumers: Mutex<Vec<JoinHandle<Vec<String>>>>,
    stats: Arc<IngestionStats>,
}

impl InventoryPipeline {
    pub fn new(reader: impl Into<String>, events: Arc<EventBus>) -> Self {
        Self {
            reader: reader.into(),
            events,
            session: Mutex::new(None),
            consumers: Mutex::new(Vec::new()),
            stats: Arc::new(IngestionStats::default()),
        }
    }

    pub fn state(&self) -> InventoryState {
        if self.session.lock().is_some() {
            InventoryState::Running
        } else {
            InventoryState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == InventoryState::Running
    }

    /// Run id of the live session, if any
    pub fn current_run_id(&self) -> Option<Uuid> {
        self.session.lock().as_ref().map(|session| session.run_id)
    }

    /// Reads enqueued for deduplication, across all sessions
    pub fn accepted_reads(&self) -> u64 {
        self.stats.accepted.load(Ordering::Relaxed)
    }

    /// Reads dropped because their session had stopped accepting
    pub fn rejected_reads(&self) -> u64 {
        self.stats.rejected.load(Ordering::Relaxed)
    }

    /// Open a session, subscribe the ingestion observer and begin reporting
    pub async fn start(&self, link: &dyn DeviceLink) -> ReaderResult<Uuid> {
        let run_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(IngestionGate {
            run_id,
            accepting: AtomicBool::new(true),
            sender: Mutex::new(Some(tx)),
            stats: self.stats.clone(),
        });

        {
            let mut session = self.session.lock();
            if session.is_some() {
                return Err(ReaderError::InventoryAlreadyRunning {
                    reader: self.reader.clone(),
                });
            }
            *session = Some(ActiveSession {
                run_id,
                gate: gate.clone(),
            });
        }

        let observer = Arc::new(TagReportObserver {
            reader: self.reader.clone(),
            gate: gate.clone(),
        });

        if let Err(e) = link.subscribe(EventSource::TagsReported, observer) {
            self.discard_session(&gate);
            return Err(ReaderError::pipeline(&self.reader, "subscribe", e));
        }

        if let Err(e) = link.begin_reporting().await {
            if let Err(unsub) = link.unsubscribe(EventSource::TagsReported) {
                warn!(reader = %self.reader, error = %unsub, "Failed to roll back tag subscription");
            }
            self.discard_session(&gate);
            return Err(ReaderError::pipeline(&self.reader, "begin_reporting", e));
        }

        let span = crate::inventory_span!(reader = %self.reader, run_id = %run_id);
        let consumer = tokio::spawn(
            Self::consume(self.reader.clone(), run_id, rx, self.events.clone()).instrument(span),
        );
        {
            let mut consumers = self.consumers.lock();
            consumers.retain(|handle| !handle.is_finished());
            consumers.push(consumer);
        }

        info!(reader = %self.reader, run_id = %run_id, "Inventory started");
        Ok(run_id)
    }

    /// Close the live session for writes and end reporting
    ///
    /// Returns without waiting for the consumer; its completion is reported
    /// through `InventoryFinished`. The pipeline is idle afterwards even when
    /// a device call failed.
    pub async fn stop(&self, link: &dyn DeviceLink) -> ReaderResult<()> {
        let Some(session) = self.session.lock().take() else {
            debug!(reader = %self.reader, "Inventory not running, nothing to stop");
            return Ok(());
        };

        session.gate.close();

        let unsubscribed = link
            .unsubscribe(EventSource::TagsReported)
            .map_err(|e| ReaderError::pipeline(&self.reader, "unsubscribe", e));
        let ended = link
            .end_reporting()
            .await
            .map_err(|e| ReaderError::pipeline(&self.reader, "end_reporting", e));

        info!(reader = %self.reader, run_id = %session.run_id, "Inventory stopping");
        unsubscribed.and(ended)
    }

    /// Await every consumer still pending
    ///
    /// Finished consumers of older sessions are released when the next
    /// session starts. Returns the unique identifiers of the most recent
    /// session, or `None` when no consumer was pending.
    pub async fn wait_finished(&self) -> Option<Vec<String>> {
        let consumers: Vec<_> = std::mem::take(&mut *self.consumers.lock());
        let mut last = None;
        for consumer in consumers {
            match consumer.await {
                Ok(tags) => last = Some(tags),
                Err(e) => warn!(reader = %self.reader, error = %e, "Inventory consumer failed"),
            }
        }
        last
    }

    fn discard_session(&self, gate: &Arc<IngestionGate>) {
        gate.close();
        let mut session = self.session.lock();
        if session
            .as_ref()
            .is_some_and(|live| Arc::ptr_eq(&live.gate, gate))
        {
            session.take();
        }
    }

    async fn consume(
        reader: String,
        run_id: Uuid,
        mut rx: mpsc::UnboundedReceiver<String>,
        events: Arc<EventBus>,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();

        while let Some(epc) = rx.recv().await {
            if !seen.insert(epc.clone()) {
                continue;
            }
            debug!(epc = %epc, "Tag discovered");
            ordered.push(epc.clone());
            events.publish(ReaderEvent::TagDiscovered {
                reader: reader.clone(),
                run_id,
                epc,
                discovered_at: Utc::now(),
            });
        }

        info!(unique_tags = ordered.len(), "Inventory finished");
        events.publish(ReaderEvent::InventoryFinished {
            reader,
            run_id,
            tags: ordered.clone(),
            finished_at: Utc::now(),
        });
        ordered
    }
}
