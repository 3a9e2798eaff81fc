//! Network reachability probing

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Default LLRP port readers listen on
pub const DEFAULT_LLRP_PORT: u16 = 5084;

/// Answers whether the reader's address currently responds on the network
///
/// Implementations must return within a bounded time; an unanswered probe is
/// reported as unreachable, never as an error.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self, address: &str) -> bool;
}

/// Probe that opens (and immediately drops) a TCP connection to the reader
#[derive(Debug, Clone)]
pub struct TcpProbe {
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_LLRP_PORT, Duration::from_secs(1))
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect((address, self.port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(address = %address, port = self.port, error = %e, "Probe refused");
                false
            }
            Err(_) => {
                debug!(address = %address, port = self.port, "Probe timed out");
                false
            }
        }
    }
}
