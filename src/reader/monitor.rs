//! Network health monitor
//!
//! While a reader is offline, the monitor probes its address at a fixed
//! interval and hands control back to the supervisor as soon as it answers.
//! The monitor is a cancellable task: `start` replaces any running instance,
//! `stop` is idempotent and may be called from anywhere, including from the
//! monitor's own reconnect callback.

use crate::device::ReachabilityProbe;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Owner of the monitor, notified when the reader is reachable again
#[async_trait]
pub trait MonitorTarget: Send + Sync {
    /// Whether the reader is still meant to be running
    fn is_enabled(&self) -> bool;

    /// Called once per armed cycle when the probe succeeds
    async fn on_network_restored(&self);
}

/// Outcome of a single monitor tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Reader disabled: stop without probing
    StopDisabled,
    /// Reader answered: disarm and reconnect
    Restored,
    /// Still unreachable: wait for the next tick
    Wait,
}

impl TickDecision {
    /// Decide what a tick does (pure function)
    ///
    /// `reachable` is only consulted when the reader is enabled.
    pub fn evaluate(enabled: bool, reachable: impl FnOnce() -> bool) -> Self {
        if !enabled {
            TickDecision::StopDisabled
        } else if reachable() {
            TickDecision::Restored
        } else {
            TickDecision::Wait
        }
    }
}

struct MonitorTask {
    shutdown_tx: watch::Sender<bool>,
    armed: Arc<AtomicBool>,
    _handle: JoinHandle<()>,
}

pub struct NetworkMonitor {
    interval: Duration,
    current: Mutex<Option<MonitorTask>>,
    generation: AtomicU64,
}

impl NetworkMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a monitor cycle is armed and has not yet fired
    pub fn is_armed(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|task| task.armed.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Number of times the monitor has been started
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Arm a new monitor cycle, replacing any previous one
    pub fn start(
        &self,
        address: String,
        probe: Arc<dyn ReachabilityProbe>,
        target: Weak<dyn MonitorTarget>,
    ) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let armed = Arc::new(AtomicBool::new(true));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let handle = tokio::spawn(Self::run(
            self.interval,
            address,
            probe,
            target,
            armed.clone(),
            shutdown_rx,
            generation,
        ));

        let previous = self.current.lock().replace(MonitorTask {
            shutdown_tx,
            armed,
            _handle: handle,
        });
        if let Some(previous) = previous {
            Self::signal_stop(previous);
        }
        debug!(generation, "Network monitor armed");
    }

    /// Disarm the monitor; safe to call when nothing is running
    pub fn stop(&self) {
        let current = self.current.lock().take();
        if let Some(task) = current {
            Self::signal_stop(task);
            debug!("Network monitor stopped");
        }
    }

    fn signal_stop(task: MonitorTask) {
        task.armed.store(false, Ordering::SeqCst);
        let _ = task.shutdown_tx.send(true);
    }

    async fn run(
        interval: Duration,
        address: String,
        probe: Arc<dyn ReachabilityProbe>,
        target: Weak<dyn MonitorTarget>,
        armed: Arc<AtomicBool>,
        mut shutdown_rx: watch::Receiver<bool>,
        generation: u64,
    ) {
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    if !armed.load(Ordering::SeqCst) {
                        break;
                    }
                    let Some(target) = target.upgrade() else {
                        break;
                    };

                    let enabled = target.is_enabled();
                    let reachable = if enabled {
                        probe.is_reachable(&address).await
                    } else {
                        false
                    };

                    match TickDecision::evaluate(enabled, || reachable) {
                        TickDecision::StopDisabled => {
                            debug!(address = %address, "Reader disabled, monitor stopping");
                            armed.store(false, Ordering::SeqCst);
                            break;
                        }
                        TickDecision::Restored => {
                            info!(address = %address, "Reader reachable again");
                            armed.store(false, Ordering::SeqCst);
                            target.on_network_restored().await;
                            break;
                        }
                        TickDecision::Wait => {
                            debug!(address = %address, "Reader still unreachable");
                        }
                    }
                }
            }
        }
        debug!(generation, "Network monitor task exited");
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
