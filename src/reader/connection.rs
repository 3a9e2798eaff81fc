//! Pure connection state management for the reader supervisor
//!
//! This module contains the connection state type, reader identity and the
//! pure reconnect policy decisions. Nothing here performs I/O.

use crate::config::{OperatingParameters, SupervisorConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Connection state of a supervised reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected and no reconnect pending
    #[default]
    Disconnected,
    /// Connect request in flight
    Connecting,
    /// Link established
    Connected,
    /// Disconnected with the network monitor armed
    AwaitingNetwork,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Immutable identity of the remote reader
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderEndpoint {
    pub name: String,
    pub address: String,
    pub parameters: OperatingParameters,
}

impl ReaderEndpoint {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        parameters: OperatingParameters,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            parameters,
        }
    }

    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            config.reader.name.clone(),
            config.reader.address.clone(),
            config.parameters.clone(),
        )
    }
}

/// Consecutive failed (re)connect attempts since the last success
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounter(u32);

impl RetryCounter {
    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn record_failure(&mut self) -> u32 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// How a reader that came back on the network gets reconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPath {
    /// Reader still holds its settings; connect only
    Bare,
    /// Settings are presumed lost; connect, reconfigure and resubscribe
    Full,
}

/// Reconnect and escalation policy
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub connect_timeout: Duration,
    /// Time after a disconnect during which the reader keeps its settings
    pub grace_window: Duration,
    /// Failed reconnects tolerated before a reboot (0 disables escalation)
    pub reboot_threshold: u32,
    pub health_check_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            grace_window: Duration::from_secs(35),
            reboot_threshold: 10,
            health_check_interval: Duration::from_secs(2),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            connect_timeout: config.connection.connect_timeout(),
            grace_window: config.connection.grace_window(),
            reboot_threshold: config.connection.reboot_after_reconnects,
            health_check_interval: config.connection.health_check_interval(),
        }
    }

    /// Choose the reconnect path (pure function)
    ///
    /// A reader that has never been disconnected by us counts as unconfigured.
    pub fn reconnect_path(&self, disconnected_at: Option<Instant>, now: Instant) -> ReconnectPath {
        match disconnected_at {
            Some(at) if now.saturating_duration_since(at) < self.grace_window => {
                ReconnectPath::Bare
            }
            _ => ReconnectPath::Full,
        }
    }

    /// Whether the retry count warrants a reboot (pure function)
    pub fn should_escalate(&self, retries: RetryCounter) -> bool {
        self.reboot_threshold > 0 && retries.get() > self.reboot_threshold
    }
}

/// Log connection state transition (pure logging function)
pub fn log_state_transition(reader: &str, from: ConnectionState, to: ConnectionState) {
    match (from, to) {
        (ConnectionState::Connecting, ConnectionState::Connected) => {
            info!(reader = %reader, "Reader connected");
        }
        (ConnectionState::Connected, ConnectionState::Disconnected) => {
            info!(reader = %reader, "Reader disconnected");
        }
        (_, ConnectionState::AwaitingNetwork) => {
            info!(reader = %reader, "Waiting for reader to return to the network");
        }
        _ => {
            info!(reader = %reader, "Reader connection state: {:?} -> {:?}", from, to);
        }
    }
}
