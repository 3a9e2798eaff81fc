//! RFID reader supervisor
//!
//! Keeps a long-lived connection to a network RFID reader healthy and turns
//! its raw tag reports into a deduplicated stream of discovered identifiers.
//!
//! # Overview
//!
//! - Connection state machine with grace-window reconnects and reboot
//!   escalation
//! - Network health monitor that drives reconnects while the reader is offline
//! - Session configuration pushed to the reader in a single request
//! - Tag inventory pipeline with per-session deduplication
//! - Device access through narrow traits, with in-process mocks for tests
//!
//! # Quick Start
//!
//! ```rust
//! use rfid_supervisor::testing::mocks::{MockAdminChannel, MockDeviceLink, MockProbe};
//! use rfid_supervisor::{ReaderSupervisor, SupervisorConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SupervisorConfig::from_toml_str(
//!     r#"
//!     [reader]
//!     name = "dock-door-1"
//!     address = "192.168.1.50"
//!
//!     [parameters]
//!     tx_power_centi_dbm = 3000
//!     session = 2
//!     "#,
//! )
//! .unwrap();
//!
//! let link = Arc::new(MockDeviceLink::new("192.168.1.50"));
//! let supervisor = ReaderSupervisor::from_config(
//!     &config,
//!     link,
//!     Arc::new(MockProbe::reachable()),
//!     Box::new(MockAdminChannel::new()),
//! );
//!
//! supervisor.start_reader().await;
//! let run_id = supervisor.start_inventory().await.unwrap();
//! supervisor.stop_inventory().await.unwrap();
//! supervisor.end_reader().await.unwrap();
//! # let _ = run_id;
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod observability;
pub mod reader;
pub mod testing;

pub use config::*;
pub use error::{ReaderError, ReaderResult};
pub use reader::{ConnectionState, ReaderEvent, ReaderSupervisor};
