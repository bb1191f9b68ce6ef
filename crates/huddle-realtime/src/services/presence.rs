//! Presence tracker
//!
//! A user is online exactly while `presence:user:{id}` exists. The per-workspace
//! candidate set only narrows lookups; it is never pruned and every read filters it
//! against the live presence keys.
//!
//! Writes fail closed: if the store rejects a write the user is reported as offline
//! and no online event goes out. Reads never fail; store errors are logged and read
//! as "offline" / "nobody".

use chrono::{DateTime, Utc};
use huddle_cache::{presence_user_key, presence_workspace_key, PresenceEntry};
use huddle_core::{
    ChannelName, ConversationId, EventName, PresenceChangedPayload, User, UserId, WorkspaceId,
};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::broadcaster::EventBroadcaster;
use super::context::RealtimeContext;
use super::error::{RealtimeError, RealtimeResult};

/// Extra lifetime of the workspace candidate set beyond the presence TTL
const CANDIDATE_SET_GRACE_SECONDS: u64 = 10;

/// Presence of one conversation member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPresence {
    pub user_id: UserId,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Presence tracker
pub struct PresenceTracker<'a> {
    ctx: &'a RealtimeContext,
}

impl<'a> PresenceTracker<'a> {
    /// Create a new PresenceTracker
    pub fn new(ctx: &'a RealtimeContext) -> Self {
        Self { ctx }
    }

    /// Mark a user online in a workspace and announce it on the workspace channel.
    ///
    /// Repeating the call refreshes the TTL to the full window and announces again.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn mark_online(&self, user: &User, workspace_id: WorkspaceId) -> RealtimeResult<()> {
        let now = self.ctx.clock().now();
        let ttl = self.ctx.presence_ttl_seconds();
        let entry = PresenceEntry::new(user.id, workspace_id, now);
        let store = self.ctx.store();
        let candidates = presence_workspace_key(workspace_id);

        // Candidate first: a failure leaves the user a candidate without a key,
        // which reads as offline
        let written = async {
            store.add_to_set(&candidates, &user.id.to_string()).await?;
            store
                .expire(&candidates, ttl + CANDIDATE_SET_GRACE_SECONDS)
                .await?;
            store
                .set(&presence_user_key(user.id), &entry.to_json()?, ttl)
                .await?;
            Ok::<(), RealtimeError>(())
        }
        .await;

        if let Err(e) = written {
            warn!(user_id = %user.id, workspace_id = %workspace_id, error = %e, "Failed to mark user online");
            return Err(e);
        }

        debug!(user_id = %user.id, workspace_id = %workspace_id, "User online");

        EventBroadcaster::new(self.ctx)
            .publish_to(
                &[ChannelName::workspace(workspace_id)],
                EventName::PresenceOnline,
                &PresenceChangedPayload::new(user, workspace_id, now),
                None,
            )
            .await?;

        Ok(())
    }

    /// Remove a user's presence entry. The offline event goes to the workspace the
    /// entry named; without a live entry nothing is announced.
    ///
    /// The user stays in the workspace candidate set.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn mark_offline(&self, user: &User) -> RealtimeResult<()> {
        let key = presence_user_key(user.id);
        let store = self.ctx.store();

        let entry = match store.get(&key).await {
            Ok(raw) => raw.and_then(|raw| decode_entry(user.id, &raw)),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Failed to read presence entry");
                return Err(e.into());
            }
        };

        if let Err(e) = store.delete(&key).await {
            warn!(user_id = %user.id, error = %e, "Failed to delete presence entry");
            return Err(e.into());
        }

        let Some(entry) = entry else {
            debug!(user_id = %user.id, "No live presence entry, nothing to announce");
            return Ok(());
        };

        debug!(user_id = %user.id, workspace_id = %entry.workspace_id, "User offline");

        let now = self.ctx.clock().now();
        EventBroadcaster::new(self.ctx)
            .publish_to(
                &[ChannelName::workspace(entry.workspace_id)],
                EventName::PresenceOffline,
                &PresenceChangedPayload::new(user, entry.workspace_id, now),
                None,
            )
            .await?;

        Ok(())
    }

    /// Whether the user's presence key currently exists
    pub async fn is_online(&self, user_id: UserId) -> bool {
        match self.ctx.store().exists(&presence_user_key(user_id)).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Presence lookup failed, reporting offline");
                false
            }
        }
    }

    /// Online users of a workspace, ordered by id
    #[instrument(skip(self))]
    pub async fn online_users(&self, workspace_id: WorkspaceId) -> Vec<User> {
        let candidates = match self
            .ctx
            .store()
            .members_of_set(&presence_workspace_key(workspace_id))
            .await
        {
            Ok(members) => members,
            Err(e) => {
                warn!(workspace_id = %workspace_id, error = %e, "Failed to read presence candidates");
                return Vec::new();
            }
        };

        let mut ids: Vec<UserId> = candidates
            .iter()
            .filter_map(|raw| UserId::parse(raw).ok())
            .collect();
        ids.sort_unstable();

        let mut online = Vec::with_capacity(ids.len());
        for user_id in ids {
            if self.is_online(user_id).await {
                online.push(user_id);
            }
        }

        if online.is_empty() {
            return Vec::new();
        }

        match self.ctx.directory().find_users(&online).await {
            Ok(users) => users,
            Err(e) => {
                warn!(workspace_id = %workspace_id, error = %e, "Failed to resolve online users");
                Vec::new()
            }
        }
    }

    /// Reset a live presence entry to the full TTL and bump `last_seen`.
    ///
    /// Returns `false` when the user has no live entry; nothing is recreated.
    #[instrument(skip(self))]
    pub async fn refresh(&self, user_id: UserId) -> RealtimeResult<bool> {
        let key = presence_user_key(user_id);
        let store = self.ctx.store();

        let raw = store.get(&key).await.inspect_err(|e| {
            warn!(user_id = %user_id, error = %e, "Failed to read presence entry");
        })?;
        let Some(mut entry) = raw.and_then(|raw| decode_entry(user_id, &raw)) else {
            return Ok(false);
        };

        entry.user_id = user_id;
        entry.last_seen = self.ctx.clock().now();
        store
            .set(&key, &entry.to_json()?, self.ctx.presence_ttl_seconds())
            .await
            .inspect_err(|e| warn!(user_id = %user_id, error = %e, "Failed to refresh presence"))?;

        // The candidate set must outlive every entry it indexes
        let candidates = presence_workspace_key(entry.workspace_id);
        let extended = async {
            store.add_to_set(&candidates, &user_id.to_string()).await?;
            store
                .expire(&candidates, self.ctx.presence_ttl_seconds() + CANDIDATE_SET_GRACE_SECONDS)
                .await
        }
        .await;
        if let Err(e) = extended {
            warn!(user_id = %user_id, workspace_id = %entry.workspace_id, error = %e, "Failed to extend presence candidates");
        }

        tracing::trace!(user_id = %user_id, "Presence refreshed");
        Ok(true)
    }

    /// `last_seen` of a live presence entry
    pub async fn last_seen(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.live_entry(user_id).await.map(|entry| entry.last_seen)
    }

    /// Presence of every member of a conversation
    #[instrument(skip(self))]
    pub async fn conversation_presence(&self, conversation_id: ConversationId) -> Vec<MemberPresence> {
        let members = match self
            .ctx
            .directory()
            .conversation_members(conversation_id)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to resolve conversation members");
                return Vec::new();
            }
        };

        let mut presence = Vec::with_capacity(members.len());
        for member in members {
            let entry = self.live_entry(member.id).await;
            presence.push(MemberPresence {
                user_id: member.id,
                is_online: entry.is_some(),
                last_seen: entry.map(|e| e.last_seen),
            });
        }
        presence
    }

    async fn live_entry(&self, user_id: UserId) -> Option<PresenceEntry> {
        match self.ctx.store().get(&presence_user_key(user_id)).await {
            Ok(raw) => raw.and_then(|raw| decode_entry(user_id, &raw)),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Presence lookup failed, reporting offline");
                None
            }
        }
    }
}

fn decode_entry(user_id: UserId, raw: &str) -> Option<PresenceEntry> {
    match PresenceEntry::from_json(raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Discarding unreadable presence entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;
    use crate::transport::RecordingTransport;
    use huddle_cache::{EphemeralStore, MemoryStore, StoreError, StoreResult};
    use huddle_core::{Clock, Conversation, MemoryDirectory};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn alice() -> User {
        User::new(1, "Alice")
    }

    #[tokio::test]
    async fn test_mark_online_writes_entry_and_announces() {
        let h = Harness::new();
        let ws = WorkspaceId::new(3);

        PresenceTracker::new(&h.ctx)
            .mark_online(&alice(), ws)
            .await
            .unwrap();

        let raw = h.store.get("presence:user:1").await.unwrap().unwrap();
        let entry = PresenceEntry::from_json(&raw).unwrap();
        assert_eq!(entry.user_id, UserId::new(1));
        assert_eq!(entry.workspace_id, ws);
        assert_eq!(entry.last_seen, h.clock.now());
        assert!(h
            .store
            .members_of_set("presence:workspace:3")
            .await
            .unwrap()
            .contains("1"));

        let frames = h.transport.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel.name(), "private-workspace.3");
        assert_eq!(frames[0].event.event, "presence.user.online");
        assert_eq!(frames[0].event.data["user_name"], "Alice");
        assert_eq!(frames[0].event.data["workspace_id"], 3);
    }

    #[tokio::test]
    async fn test_online_until_ttl_elapses() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);
        tracker.mark_online(&alice(), WorkspaceId::new(3)).await.unwrap();

        h.clock.advance_secs(59);
        assert!(tracker.is_online(UserId::new(1)).await);

        h.clock.advance_secs(2);
        assert!(!tracker.is_online(UserId::new(1)).await);
    }

    #[tokio::test]
    async fn test_refresh_resets_full_window() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);
        tracker.mark_online(&alice(), WorkspaceId::new(3)).await.unwrap();

        h.clock.advance_secs(50);
        assert!(tracker.refresh(UserId::new(1)).await.unwrap());

        let remaining = h.store.ttl("presence:user:1").await.unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
        assert_eq!(tracker.last_seen(UserId::new(1)).await, Some(h.clock.now()));
    }

    #[tokio::test]
    async fn test_refresh_without_entry_is_noop() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);

        assert!(!tracker.refresh(UserId::new(1)).await.unwrap());
        assert!(!tracker.is_online(UserId::new(1)).await);
    }

    #[tokio::test]
    async fn test_mark_offline_announces_to_entry_workspace() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);
        tracker.mark_online(&alice(), WorkspaceId::new(8)).await.unwrap();

        tracker.mark_offline(&alice()).await.unwrap();

        assert!(!tracker.is_online(UserId::new(1)).await);
        let frames = h.transport.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].event.event, "presence.user.offline");
        assert_eq!(frames[1].channel.name(), "private-workspace.8");

        // Candidate set keeps the user
        assert!(h
            .store
            .members_of_set("presence:workspace:8")
            .await
            .unwrap()
            .contains("1"));
    }

    #[tokio::test]
    async fn test_mark_offline_without_entry_is_silent() {
        let h = Harness::new();

        PresenceTracker::new(&h.ctx)
            .mark_offline(&alice())
            .await
            .unwrap();

        assert!(h.transport.frames().is_empty());
    }

    #[tokio::test]
    async fn test_online_users_filters_expired_candidates() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);
        let ws = WorkspaceId::new(3);
        let bob = User::new(2, "Bob");
        h.directory.add_user(alice());
        h.directory.add_user(bob.clone());

        tracker.mark_online(&alice(), ws).await.unwrap();
        h.clock.advance_secs(30);
        tracker.mark_online(&bob, ws).await.unwrap();
        h.clock.advance_secs(35);

        // Alice expired but is still a candidate
        assert!(h
            .store
            .members_of_set("presence:workspace:3")
            .await
            .unwrap()
            .contains("1"));
        assert_eq!(tracker.online_users(ws).await, vec![bob]);
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);
        h.store.set_unavailable(true);

        let err = tracker
            .mark_online(&alice(), WorkspaceId::new(3))
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(h.transport.frames().is_empty());

        assert!(!tracker.is_online(UserId::new(1)).await);
        assert!(tracker.online_users(WorkspaceId::new(3)).await.is_empty());
        assert!(tracker.last_seen(UserId::new(1)).await.is_none());
    }

    /// Memory store whose candidate-set writes fail
    #[derive(Debug)]
    struct CandidateWritesFail(MemoryStore);

    #[async_trait::async_trait]
    impl EphemeralStore for CandidateWritesFail {
        async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
            self.0.set(key, value, ttl_seconds).await
        }
        async fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key).await
        }
        async fn delete(&self, key: &str) -> StoreResult<bool> {
            self.0.delete(key).await
        }
        async fn exists(&self, key: &str) -> StoreResult<bool> {
            self.0.exists(key).await
        }
        async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
            self.0.expire(key, ttl_seconds).await
        }
        async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
            self.0.ttl(key).await
        }
        async fn add_to_set(&self, _key: &str, _member: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable)
        }
        async fn remove_from_set(&self, key: &str, member: &str) -> StoreResult<()> {
            self.0.remove_from_set(key, member).await
        }
        async fn members_of_set(&self, key: &str) -> StoreResult<HashSet<String>> {
            self.0.members_of_set(key).await
        }
        async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
            self.0.zadd(key, score, member).await
        }
        async fn zrange(&self, key: &str, start: isize, end: isize) -> StoreResult<Vec<(String, f64)>> {
            self.0.zrange(key, start, end).await
        }
        async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
            self.0.zscore(key, member).await
        }
        async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
            self.0.zrem(key, member).await
        }
        async fn ping(&self) -> StoreResult<()> {
            self.0.ping().await
        }
    }

    #[tokio::test]
    async fn test_failed_candidate_write_leaves_user_offline() {
        let transport = RecordingTransport::new();
        let ctx = RealtimeContext::builder()
            .store(Arc::new(CandidateWritesFail(MemoryStore::new())))
            .directory(Arc::new(MemoryDirectory::new()))
            .transport(Arc::new(transport.clone()))
            .build()
            .unwrap();
        let tracker = PresenceTracker::new(&ctx);

        let err = tracker
            .mark_online(&alice(), WorkspaceId::new(3))
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());

        assert!(!tracker.is_online(UserId::new(1)).await);
        assert!(tracker.last_seen(UserId::new(1)).await.is_none());
        assert!(transport.frames().is_empty());
    }

    #[tokio::test]
    async fn test_conversation_presence() {
        let h = Harness::new();
        let tracker = PresenceTracker::new(&h.ctx);
        let conversation = ConversationId::new(5);
        h.directory.add_user(alice());
        h.directory.add_user(User::new(2, "Bob"));
        h.directory
            .add_conversation(Conversation::new(5, 3, Some("general".to_string())));
        h.directory.join_conversation(conversation, UserId::new(1));
        h.directory.join_conversation(conversation, UserId::new(2));

        tracker.mark_online(&alice(), WorkspaceId::new(3)).await.unwrap();

        let presence = tracker.conversation_presence(conversation).await;
        assert_eq!(
            presence,
            vec![
                MemberPresence {
                    user_id: UserId::new(1),
                    is_online: true,
                    last_seen: Some(h.clock.now()),
                },
                MemberPresence {
                    user_id: UserId::new(2),
                    is_online: false,
                    last_seen: None,
                },
            ]
        );
    }
}
