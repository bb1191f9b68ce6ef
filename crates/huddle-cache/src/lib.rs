//! # huddle-cache
//!
//! Ephemeral state for the fan-out core: presence entries, workspace candidate sets,
//! and per-conversation typing collections, plus Redis pub/sub for multi-node delivery.
//!
//! ## Features
//!
//! - **Store**: the `EphemeralStore` trait (per-key TTL, sets, sorted sets)
//! - **Redis**: `RedisStore` over a deadpool-managed connection pool
//! - **Memory**: `MemoryStore`, clock-driven expiry for single-node runs and tests
//! - **Pub/Sub**: publisher and reconnecting subscriber keyed by wire channel names
//!
//! ## Example
//!
//! ```ignore
//! use huddle_cache::{EphemeralStore, RedisPool, RedisPoolConfig, RedisStore};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let store = RedisStore::new(pool);
//!
//! store.set("presence:user:1", r#"{"user_id":1,"workspace_id":1}"#, 60).await?;
//! assert!(store.exists("presence:user:1").await?);
//! ```

pub mod keys;
pub mod pool;
pub mod pubsub;
pub mod store;

// Re-export key helpers
pub use keys::{
    presence_user_key, presence_workspace_key, typing_key, PresenceEntry, PRESENCE_USER_PREFIX,
    PRESENCE_WORKSPACE_PREFIX, TYPING_PREFIX,
};

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig};

// Re-export store types
pub use store::{EphemeralStore, MemoryStore, RedisStore, SharedStore, StoreError, StoreResult};

// Re-export pubsub types
pub use pubsub::{
    PubSubEvent, Publisher, ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig,
    SubscriberError, SubscriberResult,
};
