//! Test helpers and utilities for integration tests

use rfid_supervisor::config::OperatingParameters;
use rfid_supervisor::device::{ReaderMode, SearchMode};
use rfid_supervisor::reader::{ReaderEndpoint, ReconnectPolicy};
use rfid_supervisor::testing::mocks::{MockAdminChannel, MockDeviceLink, MockProbe};
use rfid_supervisor::{ReaderEvent, ReaderSupervisor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[allow(dead_code)]
pub const TEST_ADDRESS: &str = "192.0.2.10";

/// Supervisor wired to mocks the test keeps handles to
#[allow(dead_code)]
pub struct Harness {
    pub supervisor: ReaderSupervisor,
    pub link: Arc<MockDeviceLink>,
    pub probe: Arc<MockProbe>,
    pub admin: MockAdminChannel,
}

#[allow(dead_code)]
pub fn test_endpoint() -> ReaderEndpoint {
    ReaderEndpoint::new(
        "test-reader",
        TEST_ADDRESS,
        OperatingParameters {
            tx_power_centi_dbm: 3000,
            session: 2,
            search_mode: SearchMode::DualTarget,
            reader_mode: ReaderMode::AutoSetDenseReader,
        },
    )
}

/// Reconnect policy with a short monitor interval for tests
#[allow(dead_code)]
pub fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        connect_timeout: Duration::from_secs(1),
        grace_window: Duration::from_secs(35),
        reboot_threshold: 10,
        health_check_interval: Duration::from_millis(10),
    }
}

#[allow(dead_code)]
pub fn harness(policy: ReconnectPolicy) -> Harness {
    harness_with_admin(policy, MockAdminChannel::new())
}

#[allow(dead_code)]
pub fn harness_with_admin(policy: ReconnectPolicy, admin: MockAdminChannel) -> Harness {
    let link = Arc::new(MockDeviceLink::new(TEST_ADDRESS));
    let probe = Arc::new(MockProbe::reachable());
    let supervisor = ReaderSupervisor::builder(
        test_endpoint(),
        link.clone(),
        probe.clone(),
        Box::new(admin.clone()),
    )
    .policy(policy)
    .build();

    Harness {
        supervisor,
        link,
        probe,
        admin,
    }
}

/// Poll `condition` until it holds or `timeout` elapses
#[allow(dead_code)]
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Collect every event already queued on the receiver
#[allow(dead_code)]
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<ReaderEvent>) -> Vec<ReaderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
