//! Out-of-band administrative shell
//!
//! Used only for reboot escalation after repeated reconnect failures.

use super::DeviceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Login for the administrative shell
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Outcome of a shell command as reported by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Success,
    Failed,
    UnknownCommand,
}

#[async_trait]
pub trait AdminChannel: Send + Sync {
    async fn open_session(
        &mut self,
        address: &str,
        credentials: &AdminCredentials,
        timeout: Duration,
    ) -> Result<(), DeviceError>;

    /// Run a command and return its status plus the textual reply
    async fn send(&mut self, command: &str) -> Result<(CommandStatus, String), DeviceError>;

    /// Close the session; safe to call when no session is open
    async fn close(&mut self);
}
