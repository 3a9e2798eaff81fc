//! Observability for the reader supervisor
//!
//! Structured logging through `tracing`, with span macros for reader
//! operations and inventory sessions.

pub mod logging;

// Re-export for convenience
pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{inventory_span, reader_span};
