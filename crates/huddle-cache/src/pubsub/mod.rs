//! Redis Pub/Sub module.
//!
//! Carries broadcast frames between gateway nodes. Redis channel names are the
//! wire channel names (`private-conversation.42`), so a node subscribes to exactly
//! the channels its local sockets listen on.

mod publisher;
mod subscriber;

pub use publisher::{PubSubEvent, Publisher};
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
