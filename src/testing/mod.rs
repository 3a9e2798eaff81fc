//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for driving the reader supervisor
//! without reader hardware or a network.

pub mod mocks;

pub use mocks::*;
