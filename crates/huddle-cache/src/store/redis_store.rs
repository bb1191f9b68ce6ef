//! Redis-backed ephemeral store.
//!
//! One pooled connection per call; TTLs are native Redis expiries.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{EphemeralStore, StoreResult};
use crate::pool::RedisPool;

/// `EphemeralStore` over a Redis connection pool
#[derive(Debug, Clone)]
pub struct RedisStore {
    pool: RedisPool,
}

impl RedisStore {
    /// Create a new store
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool
    #[must_use]
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }
}

fn ttl_arg(ttl_seconds: u64) -> i64 {
    i64::try_from(ttl_seconds).unwrap_or(i64::MAX)
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let applied: bool = conn.expire(key, ttl_arg(ttl_seconds)).await?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.pool.get().await?;
        let ttl: i64 = conn.ttl(key).await?;
        // -2: no such key, -1: no expiry
        Ok(u64::try_from(ttl).ok().map(Duration::from_secs))
    }

    async fn add_to_set(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        conn.sadd::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        conn.srem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn members_of_set(&self, key: &str) -> StoreResult<HashSet<String>> {
        let mut conn = self.pool.get().await?;
        let members: HashSet<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zrange(&self, key: &str, start: isize, end: isize) -> StoreResult<Vec<(String, f64)>> {
        let mut conn = self.pool.get().await?;
        let members: Vec<(String, f64)> = conn.zrange_withscores(key, start, end).await?;
        Ok(members)
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.pool.get().await?;
        let score: Option<f64> = conn.zscore(key, member).await?;
        Ok(score)
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let removed: i64 = conn.zrem(key, member).await?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.pool.health_check().await
    }
}
