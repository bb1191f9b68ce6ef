//! Ephemeral state store.
//!
//! The store is the only shared mutable resource of the fan-out core. Operations
//! are independent: nothing here spans more than one key atomically.

mod memory;
mod redis_store;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable")]
    Unavailable,

    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),
}

impl StoreError {
    /// Whether the backend could not be reached at all
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::GetConnection(_) | Self::Unavailable => true,
            Self::Redis(e) => e.is_io_error() || e.is_connection_refusal() || e.is_timeout(),
            Self::CreatePool(_) | Self::WrongType(_) => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store with per-key TTL, sets, and sorted sets
#[async_trait]
pub trait EphemeralStore: Send + Sync + std::fmt::Debug {
    /// Upsert a string value with expiry, replacing any previous TTL
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Read a string value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete a key of any kind. Returns whether it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Check whether a key exists (and has not expired)
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Set a TTL on an existing key. Returns `false` when the key is absent.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool>;

    /// Remaining lifetime of a key. `None` when absent or without expiry.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Add a member to a set
    async fn add_to_set(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Remove a member from a set
    async fn remove_from_set(&self, key: &str, member: &str) -> StoreResult<()>;

    /// All members of a set (empty when absent)
    async fn members_of_set(&self, key: &str) -> StoreResult<HashSet<String>>;

    /// Add or re-score a member of a sorted set
    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()>;

    /// Members by ascending score with their scores. `start`/`end` are inclusive
    /// and may be negative to count from the end (`0, -1` is everything).
    async fn zrange(&self, key: &str, start: isize, end: isize) -> StoreResult<Vec<(String, f64)>>;

    /// Score of one member
    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// Remove a member from a sorted set. Returns whether it was present.
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Round-trip check against the backend
    async fn ping(&self) -> StoreResult<()>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn EphemeralStore>;

/// Resolve Redis-style inclusive, possibly negative bounds against a length
pub(crate) fn normalize_range(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    if len == 0 {
        return None;
    }
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if start > end || start >= len || end < 0 {
        return None;
    }
    Some((start as usize, end as usize))
}
