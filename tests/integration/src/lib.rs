//! Integration test utilities for the huddle real-time core
//!
//! Two harnesses: [`World`] drives the trackers directly over a manual clock,
//! and [`TestServer`] runs the whole WebSocket gateway on an ephemeral port.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
