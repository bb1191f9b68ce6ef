//! In-process ephemeral store.
//!
//! Mirrors the Redis semantics the trackers rely on: `set` replaces the TTL, set and
//! sorted-set writes keep an existing TTL, and an expired key is indistinguishable
//! from a missing one on every read. Expiry is evaluated against an injected
//! [`Clock`], so tests can move time without sleeping.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use huddle_core::{Clock, SystemClock};

use super::{normalize_range, EphemeralStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(HashSet<String>),
    SortedSet(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `EphemeralStore` held in a `DashMap`
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store on the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store whose expiry follows the given clock
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every operation fail with `StoreError::Unavailable` (outage simulation)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Number of live keys
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether no live keys remain
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Drop the key if its TTL has passed
    fn purge_expired(&self, key: &str) {
        let now = self.clock.now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn expiry_from_now(&self, ttl_seconds: u64) -> DateTime<Utc> {
        let now = self.clock.now();
        chrono::Duration::try_seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn wrong_type(key: &str) -> StoreError {
        StoreError::WrongType(key.to_string())
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        self.check_available()?;
        let entry = Entry {
            value: Value::Str(value.to_string()),
            expires_at: Some(self.expiry_from_now(ttl_seconds)),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        self.purge_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check_available()?;
        self.purge_expired(key);
        Ok(self.entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check_available()?;
        self.purge_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        self.check_available()?;
        self.purge_expired(key);
        let expires_at = self.expiry_from_now(ttl_seconds);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        self.check_available()?;
        self.purge_expired(key);
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .and_then(|at| (at - now).to_std().ok()))
    }

    async fn add_to_set(&self, key: &str, member: &str) -> StoreResult<()> {
        self.check_available()?;
        self.purge_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Set(HashSet::new())));
        match &mut entry.value {
            Value::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> StoreResult<()> {
        self.check_available()?;
        self.purge_expired(key);
        let emptied = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::Set(members) => {
                    members.remove(member);
                    members.is_empty()
                }
                _ => return Err(Self::wrong_type(key)),
            },
            None => false,
        };
        if emptied {
            // Redis deletes a set once its last member is removed
            self.entries
                .remove_if(key, |_, e| matches!(&e.value, Value::Set(m) if m.is_empty()));
        }
        Ok(())
    }

    async fn members_of_set(&self, key: &str) -> StoreResult<HashSet<String>> {
        self.check_available()?;
        self.purge_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(HashSet::new()),
            Some(Value::Set(members)) => Ok(members),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
        self.check_available()?;
        self.purge_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::SortedSet(HashMap::new())));
        match &mut entry.value {
            Value::SortedSet(members) => {
                members.insert(member.to_string(), score);
                Ok(())
            }
            _ => Err(Self::wrong_type(key)),
        }
    }

    async fn zrange(&self, key: &str, start: isize, end: isize) -> StoreResult<Vec<(String, f64)>> {
        self.check_available()?;
        self.purge_expired(key);
        let mut members: Vec<(String, f64)> = match self.entries.get(key).map(|e| e.value.clone()) {
            None => return Ok(Vec::new()),
            Some(Value::SortedSet(members)) => members.into_iter().collect(),
            Some(_) => return Err(Self::wrong_type(key)),
        };

        // Score ascending, ties broken lexicographically by member
        members.sort_by(|(a_member, a_score), (b_member, b_score)| {
            a_score
                .partial_cmp(b_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_member.cmp(b_member))
        });

        Ok(match normalize_range(members.len(), start, end) {
            Some((from, to)) => members.drain(from..=to).collect(),
            None => Vec::new(),
        })
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.check_available()?;
        self.purge_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(None),
            Some(Value::SortedSet(members)) => Ok(members.get(member).copied()),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.check_available()?;
        self.purge_expired(key);
        let (removed, emptied) = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::SortedSet(members) => {
                    let removed = members.remove(member).is_some();
                    (removed, members.is_empty())
                }
                _ => return Err(Self::wrong_type(key)),
            },
            None => (false, false),
        };
        if emptied {
            self.entries
                .remove_if(key, |_, e| matches!(&e.value, Value::SortedSet(m) if m.is_empty()));
        }
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}
