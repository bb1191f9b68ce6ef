//! Event broadcasting
//!
//! Gets events onto local sockets: directly in single-node mode, or via Redis
//! Pub/Sub when several gateway nodes share the load.

mod dispatcher;
mod local;

pub use dispatcher::EventDispatcher;
pub use local::LocalTransport;
