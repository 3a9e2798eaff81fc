//! Reader supervision
//!
//! The pure pieces (connection state, reconnect policy, settings composition,
//! status cache) are kept apart from the tasks that drive the device:
//!
//! - `connection` - state, identity and reconnect/escalation decisions
//! - `status` - last-known antenna and GPI states
//! - `configurator` - settings composition and push
//! - `monitor` - periodic reachability probe while offline
//! - `inventory` - tag ingestion, deduplication and completion
//! - `supervisor` - the connection state machine tying it together
//! - `events` - notifications published to the application

pub mod configurator;
pub mod connection;
pub mod events;
pub mod inventory;
pub mod monitor;
pub mod status;
pub mod supervisor;

pub use configurator::{KeepalivePolicy, SessionConfigurator};
pub use connection::{ConnectionState, ReaderEndpoint, ReconnectPath, ReconnectPolicy, RetryCounter};
pub use events::{EventBus, ReaderEvent};
pub use inventory::{InventoryPipeline, InventoryState, TagReportObserver};
pub use monitor::{MonitorTarget, NetworkMonitor, TickDecision};
pub use status::StatusCache;
pub use supervisor::{ReaderSupervisor, SupervisorBuilder, REBOOT_COMMAND};
