//! Connection management
//!
//! Manages WebSocket connections, their identities, and channel subscriptions.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState, Identity, OutboundFrame};
pub use manager::{ConnectionManager, RemovedConnection};
