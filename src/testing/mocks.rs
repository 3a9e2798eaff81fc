//! Mock implementations for testing
//!
//! Provides mock DeviceLink, ReachabilityProbe and AdminChannel
//! implementations so the supervisor can be driven without reader hardware.
//! `MockDeviceLink` doubles as the simulated reader used by the CLI.

use crate::device::{
    AdminChannel, AdminCredentials, AntennaConfig, AntennaStatus, CommandStatus, DeviceError,
    DeviceEvent, DeviceLink, DeviceObserver, EventSource, GpiStatus, ReachabilityProbe,
    ReaderSettings, ReaderStatus,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number of antenna and GPI ports on the simulated reader
pub const MOCK_PORT_COUNT: u16 = 4;

#[derive(Debug, Default)]
struct CallCounts {
    connect: AtomicUsize,
    disconnect: AtomicUsize,
    clear_queued: AtomicUsize,
    apply_settings: AtomicUsize,
    begin_reporting: AtomicUsize,
    end_reporting: AtomicUsize,
    resume: AtomicUsize,
}

#[derive(Debug, Default)]
struct FailureToggles {
    connect: AtomicBool,
    /// Remaining connect attempts that fail before `connect` is consulted
    next_connects: AtomicU32,
    disconnect: AtomicBool,
    query_status: AtomicBool,
    apply_settings: AtomicBool,
    begin_reporting: AtomicBool,
    end_reporting: AtomicBool,
    subscribe: AtomicBool,
}

/// In-process reader simulation
///
/// Records every control call, keeps one observer per event source like the
/// real SDK and delivers events synchronously through [`Self::emit`].
pub struct MockDeviceLink {
    address: String,
    name: String,
    connected: AtomicBool,
    active: AtomicBool,
    observers: Mutex<HashMap<EventSource, Arc<dyn DeviceObserver>>>,
    status: Mutex<ReaderStatus>,
    default_settings: Mutex<ReaderSettings>,
    applied: Mutex<Vec<ReaderSettings>>,
    last_connect_timeout: Mutex<Option<Duration>>,
    calls: CallCounts,
    failures: FailureToggles,
}

impl MockDeviceLink {
    pub fn new(address: impl Into<String>) -> Self {
        let status = ReaderStatus {
            antennas: (1..=MOCK_PORT_COUNT)
                .map(|port| AntennaStatus {
                    port,
                    connected: true,
                })
                .collect(),
            gpis: (1..=MOCK_PORT_COUNT)
                .map(|port| GpiStatus { port, state: false })
                .collect(),
            temperature_celsius: 38,
            is_active: false,
        };
        let default_settings = ReaderSettings {
            antennas: (1..=MOCK_PORT_COUNT)
                .map(|port| AntennaConfig {
                    port,
                    enabled: false,
                    tx_power_dbm: None,
                })
                .collect(),
            ..Default::default()
        };

        Self {
            address: address.into(),
            name: "mock-reader".to_string(),
            connected: AtomicBool::new(false),
            active: AtomicBool::new(false),
            observers: Mutex::new(HashMap::new()),
            status: Mutex::new(status),
            default_settings: Mutex::new(default_settings),
            applied: Mutex::new(Vec::new()),
            last_connect_timeout: Mutex::new(None),
            calls: CallCounts::default(),
            failures: FailureToggles::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Deliver an event to the observer registered for its source, if any
    pub fn emit(&self, event: DeviceEvent) {
        let observer = self.observers.lock().get(&event.source()).cloned();
        if let Some(observer) = observer {
            observer.on_event(event);
        }
    }

    /// Drop the link and notify the connection-lost observer
    pub fn lose_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.emit(DeviceEvent::ConnectionLost);
    }

    pub fn observer(&self, source: EventSource) -> Option<Arc<dyn DeviceObserver>> {
        self.observers.lock().get(&source).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether the simulated reader is singulating
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: ReaderStatus) {
        *self.status.lock() = status;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.failures.connect.store(fail, Ordering::SeqCst);
    }

    /// Fail exactly the next `count` connect attempts
    pub fn fail_next_connects(&self, count: u32) {
        self.failures.next_connects.store(count, Ordering::SeqCst);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.failures.disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_query_status(&self, fail: bool) {
        self.failures.query_status.store(fail, Ordering::SeqCst);
    }

    pub fn fail_apply_settings(&self, fail: bool) {
        self.failures.apply_settings.store(fail, Ordering::SeqCst);
    }

    pub fn fail_begin_reporting(&self, fail: bool) {
        self.failures.begin_reporting.store(fail, Ordering::SeqCst);
    }

    pub fn fail_end_reporting(&self, fail: bool) {
        self.failures.end_reporting.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.failures.subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.calls.connect.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.calls.disconnect.load(Ordering::SeqCst)
    }

    pub fn clear_queued_calls(&self) -> usize {
        self.calls.clear_queued.load(Ordering::SeqCst)
    }

    pub fn apply_settings_calls(&self) -> usize {
        self.calls.apply_settings.load(Ordering::SeqCst)
    }

    pub fn begin_reporting_calls(&self) -> usize {
        self.calls.begin_reporting.load(Ordering::SeqCst)
    }

    pub fn end_reporting_calls(&self) -> usize {
        self.calls.end_reporting.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.calls.resume.load(Ordering::SeqCst)
    }

    pub fn last_connect_timeout(&self) -> Option<Duration> {
        *self.last_connect_timeout.lock()
    }

    pub fn last_applied_settings(&self) -> Option<ReaderSettings> {
        self.applied.lock().last().cloned()
    }

    fn take_connect_failure(&self) -> bool {
        let pending = self
            .failures
            .next_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        pending || self.failures.connect.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceLink for MockDeviceLink {
    fn address(&self) -> &str {
        &self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, timeout: Duration) -> Result<(), DeviceError> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        *self.last_connect_timeout.lock() = Some(timeout);

        if self.take_connect_failure() {
            return Err(DeviceError::ConnectTimeout {
                address: self.address.clone(),
                timeout,
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
        if self.failures.disconnect.load(Ordering::SeqCst) {
            return Err(DeviceError::Other("mock disconnect failure".to_string()));
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn query_status(&self) -> Result<ReaderStatus, DeviceError> {
        if self.failures.query_status.load(Ordering::SeqCst) {
            return Err(DeviceError::Other("mock status failure".to_string()));
        }
        if !self.is_connected() {
            return Err(DeviceError::NotConnected);
        }
        let mut status = self.status.lock().clone();
        status.is_active = self.is_active();
        Ok(status)
    }

    async fn query_default_settings(&self) -> Result<ReaderSettings, DeviceError> {
        Ok(self.default_settings.lock().clone())
    }

    async fn apply_settings(&self, settings: &ReaderSettings) -> Result<(), DeviceError> {
        self.calls.apply_settings.fetch_add(1, Ordering::SeqCst);
        if self.failures.apply_settings.load(Ordering::SeqCst) {
            return Err(DeviceError::Rejected("mock settings rejected".to_string()));
        }
        self.applied.lock().push(settings.clone());
        Ok(())
    }

    async fn clear_queued_operations(&self) -> Result<(), DeviceError> {
        self.calls.clear_queued.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn begin_reporting(&self) -> Result<(), DeviceError> {
        self.calls.begin_reporting.fetch_add(1, Ordering::SeqCst);
        if self.failures.begin_reporting.load(Ordering::SeqCst) {
            return Err(DeviceError::Rejected("mock begin failure".to_string()));
        }
        self.set_active(true);
        Ok(())
    }

    async fn end_reporting(&self) -> Result<(), DeviceError> {
        self.calls.end_reporting.fetch_add(1, Ordering::SeqCst);
        if self.failures.end_reporting.load(Ordering::SeqCst) {
            return Err(DeviceError::Rejected("mock end failure".to_string()));
        }
        self.set_active(false);
        Ok(())
    }

    async fn resume_buffered_reports_and_events(&self) -> Result<(), DeviceError> {
        self.calls.resume.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(
        &self,
        source: EventSource,
        observer: Arc<dyn DeviceObserver>,
    ) -> Result<(), DeviceError> {
        if self.failures.subscribe.load(Ordering::SeqCst) {
            return Err(DeviceError::Rejected("mock subscribe failure".to_string()));
        }
        self.observers.lock().insert(source, observer);
        Ok(())
    }

    fn unsubscribe(&self, source: EventSource) -> Result<(), DeviceError> {
        self.observers.lock().remove(&source);
        Ok(())
    }
}

/// Probe whose answer is set by the test
#[derive(Debug, Default)]
pub struct MockProbe {
    reachable: AtomicBool,
    probes: AtomicUsize,
}

impl MockProbe {
    pub fn reachable() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for MockProbe {
    async fn is_reachable(&self, _address: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Admin shell that records commands
///
/// Clones share their records, so a test can keep one while the supervisor
/// owns another.
#[derive(Debug, Clone)]
pub struct MockAdminChannel {
    pub commands: Arc<Mutex<Vec<String>>>,
    pub sessions: Arc<Mutex<Vec<(String, String)>>>,
    pub closes: Arc<AtomicUsize>,
    pub should_fail: bool,
    pub reply_status: CommandStatus,
}

impl Default for MockAdminChannel {
    fn default() -> Self {
        Self {
            commands: Arc::default(),
            sessions: Arc::default(),
            closes: Arc::default(),
            should_fail: false,
            reply_status: CommandStatus::Success,
        }
    }
}

impl MockAdminChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn with_reply_status(reply_status: CommandStatus) -> Self {
        Self {
            reply_status,
            ..Default::default()
        }
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// (address, username) of every opened session
    pub fn get_sessions(&self) -> Vec<(String, String)> {
        self.sessions.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminChannel for MockAdminChannel {
    async fn open_session(
        &mut self,
        address: &str,
        credentials: &AdminCredentials,
        _timeout: Duration,
    ) -> Result<(), DeviceError> {
        if self.should_fail {
            return Err(DeviceError::Other("mock login refused".to_string()));
        }
        self.sessions
            .lock()
            .push((address.to_string(), credentials.username.clone()));
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(CommandStatus, String), DeviceError> {
        self.commands.lock().push(command.to_string());
        Ok((self.reply_status, format!("Status='0,{command}'")))
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
