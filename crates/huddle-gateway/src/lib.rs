//! # huddle-gateway
//!
//! WebSocket gateway: clients identify, subscribe to channels through the
//! authorization gate, send heartbeats and typing signals, and receive broadcast
//! events as dispatch frames.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, GatewayState};
