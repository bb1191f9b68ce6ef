//! Multi-node transport over Redis pub/sub.

use async_trait::async_trait;
use huddle_cache::{PubSubEvent, Publisher};
use huddle_core::ChannelName;

use super::{Transport, TransportResult};

/// Publishes frames on Redis channels named after the wire channel; every gateway
/// node subscribed to that channel delivers to its local sockets.
#[derive(Debug, Clone)]
pub struct RedisTransport {
    publisher: Publisher,
}

impl RedisTransport {
    #[must_use]
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn deliver(&self, channels: &[ChannelName], event: &PubSubEvent) -> TransportResult<()> {
        let payload = event.to_json()?;
        let receivers = self.publisher.publish_many(channels, &payload).await?;

        tracing::trace!(event = %event.event, receivers = receivers, "Frame handed to Redis");
        Ok(())
    }
}
