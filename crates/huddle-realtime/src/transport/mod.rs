//! Delivery port for broadcast frames.
//!
//! The broadcaster hands each event to a [`Transport`] once, with every target
//! channel. Implementations deliver to whoever is subscribed at that moment; there
//! is no acknowledgment and no replay.

mod recording;
mod redis_transport;

use std::sync::Arc;

use async_trait::async_trait;
use huddle_cache::{PubSubEvent, StoreError};
use huddle_core::ChannelName;

pub use recording::{RecordedFrame, RecordingTransport};
pub use redis_transport::RedisTransport;

/// Error type for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Pub/Sub backend error: {0}")]
    Backend(#[from] StoreError),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Publish/subscribe delivery layer
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Deliver one event envelope to every subscriber of each channel.
    /// `event.except_session` names a session that must not receive it.
    async fn deliver(&self, channels: &[ChannelName], event: &PubSubEvent) -> TransportResult<()>;
}

/// Shared transport handle
pub type SharedTransport = Arc<dyn Transport>;
