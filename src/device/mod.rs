//! Collaborator interfaces for the reader hardware
//!
//! The supervisor never speaks the reader's wire protocol itself. Everything it
//! needs from the device is expressed through the traits in this module:
//!
//! - [`DeviceLink`] - control API and event subscriptions of the reader SDK
//! - [`probe::ReachabilityProbe`] - network reachability check used while offline
//! - [`admin::AdminChannel`] - out-of-band shell used only to reboot the reader

pub mod admin;
pub mod probe;
pub mod settings;

pub use admin::{AdminChannel, AdminCredentials, CommandStatus};
pub use probe::{ReachabilityProbe, TcpProbe};
pub use settings::{
    AntennaConfig, AutoStopMode, KeepaliveConfig, ReaderMode, ReaderSettings, ReportConfig,
    ReportMode, SearchMode,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by device collaborators
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Connection to {address} timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },
    #[error("Device link is not connected")]
    NotConnected,
    #[error("Device rejected request: {0}")]
    Rejected(String),
    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device error: {0}")]
    Other(String),
}

/// Event sources a [`DeviceObserver`] can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    ConnectionLost,
    KeepaliveReceived,
    AntennaChanged,
    GpiChanged,
    TagsReported,
}

impl EventSource {
    /// Sources the supervisor keeps armed for the whole connected session
    pub const SESSION: [EventSource; 4] = [
        EventSource::ConnectionLost,
        EventSource::KeepaliveReceived,
        EventSource::AntennaChanged,
        EventSource::GpiChanged,
    ];
}

/// One physical tag read as reported by the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRead {
    /// EPC as an upper-case hexadecimal string
    pub epc: String,
    pub antenna_port: Option<u16>,
    pub peak_rssi_dbm: Option<f64>,
    pub seen_count: Option<u32>,
}

impl TagRead {
    pub fn new(epc: impl Into<String>) -> Self {
        Self {
            epc: epc.into(),
            antenna_port: None,
            peak_rssi_dbm: None,
            seen_count: None,
        }
    }
}

/// Notifications delivered by the device link on its own threads
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    ConnectionLost,
    KeepaliveReceived,
    AntennaChanged { port: u16, connected: bool },
    GpiChanged { port: u16, state: bool },
    TagsReported(Vec<TagRead>),
}

impl DeviceEvent {
    /// The subscription this event is delivered through
    pub fn source(&self) -> EventSource {
        match self {
            DeviceEvent::ConnectionLost => EventSource::ConnectionLost,
            DeviceEvent::KeepaliveReceived => EventSource::KeepaliveReceived,
            DeviceEvent::AntennaChanged { .. } => EventSource::AntennaChanged,
            DeviceEvent::GpiChanged { .. } => EventSource::GpiChanged,
            DeviceEvent::TagsReported(_) => EventSource::TagsReported,
        }
    }
}

/// Receiver of device callbacks
///
/// Called synchronously from threads owned by the device link. Implementations
/// must return quickly and must not block on async work.
pub trait DeviceObserver: Send + Sync {
    fn on_event(&self, event: DeviceEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntennaStatus {
    pub port: u16,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpiStatus {
    pub port: u16,
    pub state: bool,
}

/// Snapshot returned by [`DeviceLink::query_status`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReaderStatus {
    pub antennas: Vec<AntennaStatus>,
    pub gpis: Vec<GpiStatus>,
    pub temperature_celsius: i16,
    /// Device is currently singulating (an inventory is running on the reader)
    pub is_active: bool,
}

/// Control API of the reader SDK
///
/// Subscriptions are keyed by [`EventSource`]: subscribing replaces any
/// observer already registered for that source, and unsubscribing a source
/// with no observer is a no-op.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Network address of the reader
    fn address(&self) -> &str;

    /// Display name of the reader
    fn name(&self) -> &str;

    async fn connect(&self, timeout: Duration) -> Result<(), DeviceError>;

    async fn disconnect(&self) -> Result<(), DeviceError>;

    async fn query_status(&self) -> Result<ReaderStatus, DeviceError>;

    async fn query_default_settings(&self) -> Result<ReaderSettings, DeviceError>;

    async fn apply_settings(&self, settings: &ReaderSettings) -> Result<(), DeviceError>;

    /// Delete every operation sequence queued on the device
    async fn clear_queued_operations(&self) -> Result<(), DeviceError>;

    /// Start singulating and delivering tag reports
    async fn begin_reporting(&self) -> Result<(), DeviceError>;

    /// Stop singulating
    async fn end_reporting(&self) -> Result<(), DeviceError>;

    /// Flush reports and events the device held while the link was down
    async fn resume_buffered_reports_and_events(&self) -> Result<(), DeviceError>;

    fn subscribe(
        &self,
        source: EventSource,
        observer: Arc<dyn DeviceObserver>,
    ) -> Result<(), DeviceError>;

    fn unsubscribe(&self, source: EventSource) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_source_mapping() {
        assert_eq!(DeviceEvent::ConnectionLost.source(), EventSource::ConnectionLost);
        assert_eq!(
            DeviceEvent::KeepaliveReceived.source(),
            EventSource::KeepaliveReceived
        );
        assert_eq!(
            DeviceEvent::AntennaChanged {
                port: 1,
                connected: false
            }
            .source(),
            EventSource::AntennaChanged
        );
        assert_eq!(
            DeviceEvent::GpiChanged {
                port: 2,
                state: true
            }
            .source(),
            EventSource::GpiChanged
        );
        assert_eq!(
            DeviceEvent::TagsReported(vec![]).source(),
            EventSource::TagsReported
        );
    }

    #[test]
    fn test_session_sources_exclude_tag_reports() {
        // Tag reports are owned by the inventory pipeline, not the session
        assert!(!EventSource::SESSION.contains(&EventSource::TagsReported));
        assert_eq!(EventSource::SESSION.len(), 4);
    }

    #[test]
    fn test_device_error_display() {
        let errors = vec![
            DeviceError::ConnectTimeout {
                address: "10.0.0.1".to_string(),
                timeout: Duration::from_secs(10),
            },
            DeviceError::NotConnected,
            DeviceError::Rejected("bad session".to_string()),
            DeviceError::Other("boom".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
