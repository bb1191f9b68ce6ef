//! Single-node transport
//!
//! Hands events straight to the sockets of this process. Used when no Redis is
//! configured, so there is no other node to reach.

use crate::connection::ConnectionManager;
use async_trait::async_trait;
use huddle_cache::PubSubEvent;
use huddle_core::ChannelName;
use huddle_realtime::{Transport, TransportResult};
use std::sync::Arc;

/// Transport delivering to local connections only
#[derive(Debug, Clone)]
pub struct LocalTransport {
    connections: Arc<ConnectionManager>,
}

impl LocalTransport {
    /// Create a new LocalTransport
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn deliver(&self, channels: &[ChannelName], event: &PubSubEvent) -> TransportResult<()> {
        for channel in channels {
            self.connections.deliver(channel, event);
        }
        Ok(())
    }
}
