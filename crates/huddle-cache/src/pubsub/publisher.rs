//! Redis Pub/Sub publisher.

use huddle_core::ChannelName;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::pool::RedisPool;
use crate::store::StoreResult;

/// Envelope published on a Redis channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubSubEvent {
    /// Event name (e.g. `message.created`)
    pub event: String,
    /// Event payload
    pub data: serde_json::Value,
    /// Session that triggered the event; receivers skip it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub except_session: Option<String>,
}

impl PubSubEvent {
    /// Create a new event
    #[must_use]
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
            except_session: None,
        }
    }

    /// Exclude the originating session from delivery
    #[must_use]
    pub fn except_session(mut self, session_id: Option<String>) -> Self {
        self.except_session = session_id;
        self
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Redis Pub/Sub publisher
#[derive(Debug, Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish a pre-serialized envelope to several channels over one connection.
    /// Returns the total number of subscribed nodes reached.
    pub async fn publish_many(&self, channels: &[ChannelName], payload: &str) -> StoreResult<u32> {
        let mut conn = self.pool.get().await?;
        let mut total_receivers = 0;

        for channel in channels {
            let receivers: u32 = conn.publish(channel.name(), payload).await?;
            total_receivers += receivers;
        }

        tracing::debug!(
            channels = channels.len(),
            total_receivers = total_receivers,
            "Published event to Redis"
        );

        Ok(total_receivers)
    }
}
