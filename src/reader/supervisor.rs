//! Connection supervisor for a single reader
//!
//! Owns the connection state machine, the session subscriptions, the status
//! cache, the network monitor and the inventory pipeline. Connect and
//! disconnect sequences are serialised by the lifecycle lock; device callbacks
//! only touch synchronous state and spawn anything that needs the link.

use super::configurator::{KeepalivePolicy, SessionConfigurator};
use super::connection::{
    log_state_transition, ConnectionState, ReaderEndpoint, ReconnectPath, ReconnectPolicy,
    RetryCounter,
};
use super::events::{EventBus, ReaderEvent};
use super::inventory::{InventoryPipeline, InventoryState};
use super::monitor::{MonitorTarget, NetworkMonitor};
use super::status::StatusCache;
use crate::config::SupervisorConfig;
use crate::device::{
    AdminChannel, AdminCredentials, CommandStatus, DeviceEvent, DeviceLink, DeviceObserver,
    EventSource, ReachabilityProbe,
};
use crate::error::{ReaderError, ReaderResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn, Instrument};
use uuid::Uuid;

/// Shell command sent when reconnects keep failing
pub const REBOOT_COMMAND: &str = "reboot";

#[derive(Debug, Default)]
struct LinkState {
    connection: ConnectionState,
    retries: RetryCounter,
    disconnected_at: Option<Instant>,
    enabled: bool,
    last_keepalive: Option<Instant>,
}

/// Builder for [`ReaderSupervisor`]
pub struct SupervisorBuilder {
    endpoint: ReaderEndpoint,
    policy: ReconnectPolicy,
    keepalive: KeepalivePolicy,
    credentials: AdminCredentials,
    admin_timeout: Duration,
    link: Arc<dyn DeviceLink>,
    probe: Arc<dyn ReachabilityProbe>,
    admin: Box<dyn AdminChannel>,
}

impl SupervisorBuilder {
    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn keepalive(mut self, keepalive: KeepalivePolicy) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn admin_credentials(mut self, credentials: AdminCredentials, timeout: Duration) -> Self {
        self.credentials = credentials;
        self.admin_timeout = timeout;
        self
    }

    /// Build the supervisor
    ///
    /// Captures the current tokio runtime handle for device callbacks.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn build(self) -> ReaderSupervisor {
        let events = Arc::new(EventBus::new());
        let name = self.endpoint.name.clone();
        let monitor = NetworkMonitor::new(self.policy.health_check_interval);
        let configurator = SessionConfigurator::new(self.endpoint.clone(), self.keepalive);

        let inner = Arc::new_cyclic(|self_ref| SupervisorInner {
            self_ref: self_ref.clone(),
            endpoint: self.endpoint,
            policy: self.policy,
            credentials: self.credentials,
            admin_timeout: self.admin_timeout,
            link: self.link,
            probe: self.probe,
            admin: tokio::sync::Mutex::new(self.admin),
            state: Mutex::new(LinkState::default()),
            status: StatusCache::new(),
            configurator,
            inventory: InventoryPipeline::new(name, events.clone()),
            monitor,
            events,
            lifecycle: tokio::sync::Mutex::new(()),
            runtime: Handle::current(),
        });

        ReaderSupervisor { inner }
    }
}

/// Supervises one reader: connection resilience, session events and inventory
pub struct ReaderSupervisor {
    inner: Arc<SupervisorInner>,
}

impl ReaderSupervisor {
    pub fn builder(
        endpoint: ReaderEndpoint,
        link: Arc<dyn DeviceLink>,
        probe: Arc<dyn ReachabilityProbe>,
        admin: Box<dyn AdminChannel>,
    ) -> SupervisorBuilder {
        SupervisorBuilder {
            endpoint,
            policy: ReconnectPolicy::default(),
            keepalive: KeepalivePolicy::default(),
            credentials: crate::config::AdminSection::default().credentials(),
            admin_timeout: Duration::from_secs(5),
            link,
            probe,
            admin,
        }
    }

    /// Build a supervisor from a loaded configuration
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, see
    /// [`SupervisorBuilder::build`].
    pub fn from_config(
        config: &SupervisorConfig,
        link: Arc<dyn DeviceLink>,
        probe: Arc<dyn ReachabilityProbe>,
        admin: Box<dyn AdminChannel>,
    ) -> Self {
        Self::builder(ReaderEndpoint::from_config(config), link, probe, admin)
            .policy(ReconnectPolicy::from_config(config))
            .keepalive(KeepalivePolicy::from_config(&config.connection))
            .admin_credentials(config.admin.credentials(), config.admin.session_timeout())
            .build()
    }

    /// Enable the reader, connect and initialise the session
    ///
    /// Never fails: errors are logged and recovery is left to the network
    /// monitor. Observe the outcome through [`Self::connection_state`] or the
    /// event stream.
    pub async fn start_reader(&self) {
        self.inner.start_reader().await;
    }

    /// Disable the reader, drain any running inventory and disconnect
    ///
    /// The state always ends as `Disconnected`; a failed disconnect request is
    /// returned.
    pub async fn end_reader(&self) -> ReaderResult<()> {
        self.inner.end_reader().await
    }

    /// Start a tag inventory session and return its run id
    pub async fn start_inventory(&self) -> ReaderResult<Uuid> {
        let inner = &self.inner;
        if !inner.connection_state().is_connected() {
            return Err(ReaderError::NotConnected {
                reader: inner.endpoint.name.clone(),
            });
        }
        inner.inventory.start(inner.link.as_ref()).await
    }

    /// Stop the running inventory; a no-op when none is running
    pub async fn stop_inventory(&self) -> ReaderResult<()> {
        self.inner.inventory.stop(self.inner.link.as_ref()).await
    }

    /// Await the consumers of all stopped sessions
    pub async fn wait_inventory_finished(&self) -> Option<Vec<String>> {
        self.inner.inventory.wait_finished().await
    }

    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<ReaderEvent> {
        self.inner.events.subscribe()
    }

    pub fn endpoint(&self) -> &ReaderEndpoint {
        &self.inner.endpoint
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection_state()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retries.get()
    }

    pub fn inventory_state(&self) -> InventoryState {
        self.inner.inventory.state()
    }

    pub fn monitor_armed(&self) -> bool {
        self.inner.monitor.is_armed()
    }

    pub fn last_keepalive(&self) -> Option<Instant> {
        self.inner.state.lock().last_keepalive
    }

    pub fn gpi_state(&self, port: u16) -> bool {
        self.inner.status.gpi_state(port)
    }

    pub fn antenna_connected(&self, port: u16) -> bool {
        self.inner.status.antenna_connected(port)
    }

    pub fn rejected_reads(&self) -> u64 {
        self.inner.inventory.rejected_reads()
    }
}

impl Drop for ReaderSupervisor {
    fn drop(&mut self) {
        self.inner.monitor.stop();
    }
}

struct SupervisorInner {
    self_ref: Weak<SupervisorInner>,
    endpoint: ReaderEndpoint,
    policy: ReconnectPolicy,
    credentials: AdminCredentials,
    admin_timeout: Duration,
    link: Arc<dyn DeviceLink>,
    probe: Arc<dyn ReachabilityProbe>,
    admin: tokio::sync::Mutex<Box<dyn AdminChannel>>,
    state: Mutex<LinkState>,
    status: StatusCache,
    configurator: SessionConfigurator,
    inventory: InventoryPipeline,
    monitor: NetworkMonitor,
    events: Arc<EventBus>,
    lifecycle: tokio::sync::Mutex<()>,
    runtime: Handle,
}

impl SupervisorInner {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    fn transition(&self, to: ConnectionState) {
        let from = std::mem::replace(&mut self.state.lock().connection, to);
        if from == to {
            return;
        }
        log_state_transition(self.name(), from, to);
        self.events.publish(ReaderEvent::ConnectionStateChanged {
            reader: self.endpoint.name.clone(),
            from,
            to,
        });
    }

    async fn start_reader(&self) {
        self.bring_up(true).await;
    }

    /// Connect and initialise; with `enable` false this only runs while the
    /// reader is still enabled once the lifecycle lock is held
    async fn bring_up(&self, enable: bool) {
        let span = crate::reader_span!(reader = %self.endpoint.name, operation = "start_reader");
        async {
            let _lifecycle = self.lifecycle.lock().await;
            if enable {
                self.state.lock().enabled = true;
            } else if !self.is_enabled() {
                debug!("Reader disabled, skipping reinitialisation");
                return;
            }

            if let Err(e) = self.connect().await {
                warn!(error = %e, "Reader start deferred to network monitor");
                return;
            }
            if let Err(e) = self.init_reader().await {
                error!(error = %e, "Reader initialisation failed, retrying via network monitor");
                self.abandon_session().await;
            }
        }
        .instrument(span)
        .await
    }

    async fn end_reader(&self) -> ReaderResult<()> {
        let span = crate::reader_span!(reader = %self.endpoint.name, operation = "end_reader");
        async {
            let _lifecycle = self.lifecycle.lock().await;
            self.state.lock().enabled = false;
            self.monitor.stop();

            if let Err(e) = self.inventory.stop(self.link.as_ref()).await {
                warn!(error = %e, "Failed to stop inventory cleanly");
            }
            self.inventory.wait_finished().await;
            self.unsubscribe_session();

            let result = self.disconnect().await;
            info!("Reader ended");
            result
        }
        .instrument(span)
        .await
    }

    /// Connect the link; caller holds the lifecycle lock
    async fn connect(&self) -> ReaderResult<()> {
        if self.connection_state().is_connected() {
            debug!(reader = %self.name(), "Already connected");
            return Ok(());
        }

        self.transition(ConnectionState::Connecting);
        info!(
            reader = %self.name(),
            address = %self.endpoint.address,
            "Connecting to reader"
        );

        match self.link.connect(self.policy.connect_timeout).await {
            Ok(()) => {
                self.state.lock().retries.reset();
                self.transition(ConnectionState::Connected);
                self.after_connect().await;
                Ok(())
            }
            Err(e) => {
                let retries = self.state.lock().retries.record_failure();
                self.transition(ConnectionState::Disconnected);
                warn!(
                    reader = %self.name(),
                    retries,
                    error = %e,
                    "Failed to connect to reader"
                );
                self.arm_monitor();
                Err(ReaderError::link(self.name(), "connect", e))
            }
        }
    }

    /// Status sync after every successful connect
    async fn after_connect(&self) {
        let status = match self.link.query_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(reader = %self.name(), error = %e, "Failed to query reader status");
                None
            }
        };

        if let Some(status) = &status {
            // No session exists to stop, so reporting is ended on the link
            if status.is_active && !self.inventory.is_running() {
                warn!(
                    reader = %self.name(),
                    "Reader is singulating without an inventory session, ending reporting"
                );
                if let Err(e) = self.link.end_reporting().await {
                    warn!(reader = %self.name(), error = %e, "Failed to end stray reporting");
                }
            }
        }

        if let Err(e) = self.link.resume_buffered_reports_and_events().await {
            warn!(reader = %self.name(), error = %e, "Failed to resume buffered reports");
        }

        if let Some(status) = status {
            self.status.apply_status(&status);
            info!(
                reader = %self.name(),
                temperature_celsius = status.temperature_celsius,
                "Reader status refreshed"
            );
        }
    }

    /// Disconnect the link; caller holds the lifecycle lock
    async fn disconnect(&self) -> ReaderResult<()> {
        self.state.lock().disconnected_at = Some(Instant::now());
        self.transition(ConnectionState::Disconnected);

        self.link.disconnect().await.map_err(|e| {
            error!(reader = %self.name(), error = %e, "Failed to disconnect reader");
            ReaderError::link(self.name(), "disconnect", e)
        })
    }

    /// Configure the device and arm session subscriptions
    async fn init_reader(&self) -> ReaderResult<()> {
        let result = self.configure_and_subscribe().await;
        if result.is_err() {
            self.unsubscribe_session();
        }
        result
    }

    /// Drop a connection whose session could not be initialised
    ///
    /// Without session subscriptions a later link loss would go unseen, so
    /// the link is closed and the monitor drives a full reinitialisation.
    async fn abandon_session(&self) {
        if let Err(e) = self.disconnect().await {
            error!(reader = %self.name(), error = %e, "Disconnect after failed initialisation failed");
        }
        // Settings never reached the device
        self.state.lock().disconnected_at = None;
        self.arm_monitor();
    }

    async fn configure_and_subscribe(&self) -> ReaderResult<()> {
        self.configurator
            .configure_session(self.link.as_ref(), &self.status)
            .await
            .map_err(|e| ReaderError::configuration(self.name(), e))?;

        self.unsubscribe_session();
        let observer: Arc<dyn DeviceObserver> = Arc::new(SessionObserver {
            inner: self.self_ref.clone(),
        });
        for source in EventSource::SESSION {
            self.link
                .subscribe(source, observer.clone())
                .map_err(|e| ReaderError::pipeline(self.name(), "subscribe", e))?;
        }

        info!(reader = %self.name(), "Reader initialised");
        Ok(())
    }

    fn unsubscribe_session(&self) {
        for source in EventSource::SESSION {
            if let Err(e) = self.link.unsubscribe(source) {
                warn!(reader = %self.name(), source = ?source, error = %e, "Failed to unsubscribe");
            }
        }
    }

    fn arm_monitor(&self) {
        if !self.is_enabled() {
            return;
        }
        let target: Weak<dyn MonitorTarget> = self.self_ref.clone();
        self.monitor
            .start(self.endpoint.address.clone(), self.probe.clone(), target);
        self.transition(ConnectionState::AwaitingNetwork);
    }

    async fn handle_connection_lost(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if let Err(e) = self.disconnect().await {
            error!(reader = %self.name(), error = %e, "Disconnect after connection loss failed");
        }
        self.arm_monitor();
    }

    /// Reboot the reader when reconnects keep failing
    async fn escalate_if_needed(&self) {
        let escalate = {
            let mut state = self.state.lock();
            if self.policy.should_escalate(state.retries) {
                warn!(
                    reader = %self.name(),
                    retries = state.retries.get(),
                    threshold = self.policy.reboot_threshold,
                    "Reconnect attempts exceeded threshold, rebooting reader"
                );
                state.retries.reset();
                true
            } else {
                false
            }
        };

        if escalate {
            if let Err(e) = self.reboot().await {
                error!(reader = %self.name(), error = %e, "Reboot escalation failed");
            }
        }
    }

    async fn reboot(&self) -> ReaderResult<()> {
        let escalation = |message: String| ReaderError::Escalation {
            reader: self.endpoint.name.clone(),
            message,
        };

        let mut admin = self.admin.lock().await;
        admin
            .open_session(&self.endpoint.address, &self.credentials, self.admin_timeout)
            .await
            .map_err(|e| escalation(e.to_string()))?;

        let reply = admin.send(REBOOT_COMMAND).await;
        admin.close().await;

        let (status, reply) = reply.map_err(|e| escalation(e.to_string()))?;
        info!(reader = %self.name(), status = ?status, reply = %reply, "Reboot command sent");
        match status {
            CommandStatus::Success => Ok(()),
            other => Err(escalation(format!("reboot returned {other:?}: {reply}"))),
        }
    }

    async fn reconnect(&self) {
        if !self.is_enabled() {
            return;
        }

        let disconnected_at = self.state.lock().disconnected_at;
        match self.policy.reconnect_path(disconnected_at, Instant::now()) {
            ReconnectPath::Full => {
                info!(reader = %self.name(), "Settings presumed lost, reinitialising reader");
                self.bring_up(false).await;
            }
            ReconnectPath::Bare => {
                info!(reader = %self.name(), "Reconnecting within grace window");
                let _lifecycle = self.lifecycle.lock().await;
                if !self.is_enabled() {
                    return;
                }
                if let Err(e) = self.connect().await {
                    warn!(reader = %self.name(), error = %e, "Reconnect failed");
                }
            }
        }
    }

    fn handle_device_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::ConnectionLost => {
                warn!(reader = %self.name(), "Connection to reader lost");
                if let Some(inner) = self.self_ref.upgrade() {
                    self.runtime
                        .spawn(async move { inner.handle_connection_lost().await });
                }
            }
            DeviceEvent::KeepaliveReceived => {
                trace!(reader = %self.name(), "Keepalive");
                self.state.lock().last_keepalive = Some(Instant::now());
            }
            DeviceEvent::AntennaChanged { port, connected } => {
                info!(reader = %self.name(), port, connected, "Antenna changed");
                self.status.record_antenna(port, connected);
                self.events.publish(ReaderEvent::AntennaChanged {
                    reader: self.endpoint.name.clone(),
                    port,
                    connected,
                });
                if let Some(inner) = self.self_ref.upgrade() {
                    self.runtime
                        .spawn(async move { inner.refresh_settings().await });
                }
            }
            DeviceEvent::GpiChanged { port, state } => {
                debug!(reader = %self.name(), port, state, "GPI changed");
                self.status.record_gpi(port, state);
                self.events.publish(ReaderEvent::GpiChanged {
                    reader: self.endpoint.name.clone(),
                    port,
                    state,
                });
            }
            DeviceEvent::TagsReported(_) => {}
        }
    }

    /// Push settings rebuilt from the current antenna states
    async fn refresh_settings(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if !self.connection_state().is_connected() {
            return;
        }
        if let Err(e) = self.configurator.apply(self.link.as_ref(), &self.status).await {
            warn!(reader = %self.name(), error = %e, "Failed to refresh settings");
        }
    }
}

#[async_trait]
impl MonitorTarget for SupervisorInner {
    fn is_enabled(&self) -> bool {
        SupervisorInner::is_enabled(self)
    }

    async fn on_network_restored(&self) {
        self.escalate_if_needed().await;
        self.reconnect().await;
    }
}

/// Observer for the session event sources
struct SessionObserver {
    inner: Weak<SupervisorInner>,
}

impl DeviceObserver for SessionObserver {
    fn on_event(&self, event: DeviceEvent) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_device_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatingParameters;
    use crate::device::{ReaderMode, SearchMode};
    use crate::testing::mocks::{MockAdminChannel, MockDeviceLink, MockProbe};

    fn endpoint() -> ReaderEndpoint {
        ReaderEndpoint::new(
            "unit-reader",
            "10.0.0.9",
            OperatingParameters {
                tx_power_centi_dbm: 3000,
                session: 2,
                search_mode: SearchMode::DualTarget,
                reader_mode: ReaderMode::AutoSetDenseReader,
            },
        )
    }

    fn supervisor(link: Arc<MockDeviceLink>) -> ReaderSupervisor {
        ReaderSupervisor::builder(
            endpoint(),
            link,
            Arc::new(MockProbe::reachable()),
            Box::new(MockAdminChannel::new()),
        )
        .policy(ReconnectPolicy {
            health_check_interval: Duration::from_millis(10),
            ..Default::default()
        })
        .build()
    }

    #[tokio::test]
    async fn test_start_reader_connects_and_subscribes() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link.clone());

        supervisor.start_reader().await;

        assert_eq!(supervisor.connection_state(), ConnectionState::Connected);
        assert!(supervisor.is_enabled());
        assert_eq!(link.clear_queued_calls(), 1);
        assert_eq!(link.apply_settings_calls(), 1);
        for source in EventSource::SESSION {
            assert!(link.observer(source).is_some(), "missing {source:?}");
        }
        assert!(link.observer(EventSource::TagsReported).is_none());
    }

    #[tokio::test]
    async fn test_connect_passes_configured_timeout() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link.clone());

        supervisor.start_reader().await;

        assert_eq!(link.last_connect_timeout(), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_drift_correction_after_connect() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        link.set_active(true);
        let supervisor = supervisor(link.clone());

        supervisor.start_reader().await;

        assert_eq!(link.end_reporting_calls(), 1);
        assert_eq!(link.resume_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_configuration_drops_connection() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        link.fail_apply_settings(true);
        let supervisor = supervisor(link.clone());

        supervisor.start_reader().await;

        assert!(link.disconnect_calls() >= 1);
        for source in EventSource::SESSION {
            assert!(link.observer(source).is_none());
        }
        supervisor.end_reader().await.unwrap();
    }

    #[test]
    #[should_panic]
    fn test_build_outside_runtime_panics() {
        let _supervisor = supervisor(Arc::new(MockDeviceLink::new("10.0.0.9")));
    }

    #[tokio::test]
    async fn test_start_inventory_requires_connection() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link);

        let result = supervisor.start_inventory().await;
        assert!(matches!(result, Err(ReaderError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_gpi_and_antenna_events_forwarded() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link.clone());
        supervisor.start_reader().await;
        let mut events = supervisor.subscribe_events();

        link.emit(DeviceEvent::GpiChanged {
            port: 1,
            state: true,
        });
        link.emit(DeviceEvent::AntennaChanged {
            port: 3,
            connected: false,
        });

        assert!(supervisor.gpi_state(1));
        assert!(!supervisor.antenna_connected(3));
        assert!(matches!(
            events.recv().await,
            Some(ReaderEvent::GpiChanged {
                port: 1,
                state: true,
                ..
            })
        ));
        assert!(matches!(
            events.recv().await,
            Some(ReaderEvent::AntennaChanged {
                port: 3,
                connected: false,
                ..
            })
        ));

        // Antenna change triggers a settings refresh without the port
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(link.apply_settings_calls(), 2);
        let settings = link.last_applied_settings().unwrap();
        assert!(!settings.enabled_ports().contains(&3));
    }

    #[tokio::test]
    async fn test_keepalive_is_recorded() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link.clone());
        supervisor.start_reader().await;
        assert!(supervisor.last_keepalive().is_none());

        link.emit(DeviceEvent::KeepaliveReceived);

        assert!(supervisor.last_keepalive().is_some());
    }

    #[tokio::test]
    async fn test_end_reader_is_terminal() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link.clone());
        supervisor.start_reader().await;

        supervisor.end_reader().await.unwrap();

        assert_eq!(supervisor.connection_state(), ConnectionState::Disconnected);
        assert!(!supervisor.is_enabled());
        assert!(!supervisor.monitor_armed());
        for source in EventSource::SESSION {
            assert!(link.observer(source).is_none());
        }
    }

    #[tokio::test]
    async fn test_end_reader_reports_disconnect_failure() {
        let link = Arc::new(MockDeviceLink::new("10.0.0.9"));
        let supervisor = supervisor(link.clone());
        supervisor.start_reader().await;
        link.fail_disconnect(true);

        let result = supervisor.end_reader().await;

        assert!(matches!(
            result,
            Err(ReaderError::Link {
                operation: "disconnect",
                ..
            })
        ));
        assert_eq!(supervisor.connection_state(), ConnectionState::Disconnected);
    }
}
