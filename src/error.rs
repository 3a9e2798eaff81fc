//! Error types surfaced by the reader supervisor
//!
//! Internal failures are classified by how the supervisor reacts to them:
//! link failures are retried by the network monitor, configuration and
//! pipeline failures are rolled back and propagated to the immediate caller,
//! escalation failures are only logged.

use crate::device::DeviceError;
use thiserror::Error;

/// Main error type for reader supervision
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Link failure during {operation} on {reader}: {source}")]
    Link {
        reader: String,
        operation: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("Configuration rejected by {reader}: {source}")]
    Configuration {
        reader: String,
        #[source]
        source: DeviceError,
    },

    #[error("Reboot escalation failed on {reader}: {message}")]
    Escalation { reader: String, message: String },

    #[error("Inventory pipeline failure during {operation} on {reader}: {source}")]
    Pipeline {
        reader: String,
        operation: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("Inventory already running on {reader}")]
    InventoryAlreadyRunning { reader: String },

    #[error("Reader {reader} is not connected")]
    NotConnected { reader: String },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ReaderError {
    pub fn link<S: Into<String>>(reader: S, operation: &'static str, source: DeviceError) -> Self {
        Self::Link {
            reader: reader.into(),
            operation,
            source,
        }
    }

    pub fn configuration<S: Into<String>>(reader: S, source: DeviceError) -> Self {
        Self::Configuration {
            reader: reader.into(),
            source,
        }
    }

    pub fn pipeline<S: Into<String>>(
        reader: S,
        operation: &'static str,
        source: DeviceError,
    ) -> Self {
        Self::Pipeline {
            reader: reader.into(),
            operation,
            source,
        }
    }

    /// Whether the network monitor will retry this failure on its own
    pub fn is_transient(&self) -> bool {
        matches!(self, ReaderError::Link { .. } | ReaderError::NotConnected { .. })
    }
}

/// Result type for supervisor operations
pub type ReaderResult<T> = Result<T, ReaderError>;
