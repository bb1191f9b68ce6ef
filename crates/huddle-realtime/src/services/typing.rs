//! Typing tracker
//!
//! `typing:conv:{id}` is a sorted set of user ids scored by the epoch second of
//! their last typing signal. A member counts as typing while its score is within
//! the typing window of now. Reads filter by that rule and never prune; stale
//! members disappear when the whole key expires.

use huddle_cache::typing_key;
use huddle_core::{
    ChannelName, ConversationId, EventName, StoppedTypingPayload, TypingPayload, User, UserId,
};
use tracing::{debug, instrument, warn};

use super::broadcaster::EventBroadcaster;
use super::context::RealtimeContext;
use super::error::{RealtimeError, RealtimeResult};

/// Extra lifetime of a typing collection beyond the typing window
const COLLECTION_GRACE_SECONDS: u64 = 10;

/// Typing tracker
pub struct TypingTracker<'a> {
    ctx: &'a RealtimeContext,
}

impl<'a> TypingTracker<'a> {
    /// Create a new TypingTracker
    pub fn new(ctx: &'a RealtimeContext) -> Self {
        Self { ctx }
    }

    /// Record a typing signal and announce it on the conversation channel.
    /// `except_session` is the sender's own socket, which does not get the echo.
    #[instrument(skip(self, user, except_session), fields(user_id = %user.id))]
    pub async fn start(
        &self,
        user: &User,
        conversation_id: ConversationId,
        except_session: Option<&str>,
    ) -> RealtimeResult<()> {
        let key = typing_key(conversation_id);
        let store = self.ctx.store();
        let now = self.ctx.clock().epoch_seconds();

        let written = async {
            store.zadd(&key, now as f64, &user.id.to_string()).await?;
            store
                .expire(&key, self.ctx.typing_ttl_seconds() + COLLECTION_GRACE_SECONDS)
                .await?;
            Ok::<(), RealtimeError>(())
        }
        .await;

        if let Err(e) = written {
            warn!(user_id = %user.id, conversation_id = %conversation_id, error = %e, "Failed to record typing");
            return Err(e);
        }

        debug!(user_id = %user.id, conversation_id = %conversation_id, "User typing");

        let payload = TypingPayload {
            user_id: user.id,
            user_name: user.name.clone(),
            conversation_id,
        };
        EventBroadcaster::new(self.ctx)
            .publish_to(
                &[ChannelName::conversation(conversation_id)],
                EventName::UserTyping,
                &payload,
                except_session,
            )
            .await?;

        Ok(())
    }

    /// Drop a user's typing signal immediately and announce it
    #[instrument(skip(self, except_session))]
    pub async fn stop(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
        except_session: Option<&str>,
    ) -> RealtimeResult<()> {
        self.ctx
            .store()
            .zrem(&typing_key(conversation_id), &user_id.to_string())
            .await
            .inspect_err(|e| {
                warn!(user_id = %user_id, conversation_id = %conversation_id, error = %e, "Failed to clear typing");
            })?;

        debug!(user_id = %user_id, conversation_id = %conversation_id, "User stopped typing");

        let payload = StoppedTypingPayload {
            user_id,
            conversation_id,
        };
        EventBroadcaster::new(self.ctx)
            .publish_to(
                &[ChannelName::conversation(conversation_id)],
                EventName::UserStoppedTyping,
                &payload,
                except_session,
            )
            .await?;

        Ok(())
    }

    /// Whether the user sent a typing signal within the window
    pub async fn is_typing(&self, user_id: UserId, conversation_id: ConversationId) -> bool {
        match self
            .ctx
            .store()
            .zscore(&typing_key(conversation_id), &user_id.to_string())
            .await
        {
            Ok(score) => score.is_some_and(|score| self.is_fresh(score)),
            Err(e) => {
                warn!(user_id = %user_id, conversation_id = %conversation_id, error = %e, "Typing lookup failed");
                false
            }
        }
    }

    /// Users currently typing, oldest signal first
    #[instrument(skip(self))]
    pub async fn typing_users(&self, conversation_id: ConversationId) -> Vec<User> {
        let ids = self.fresh_members(conversation_id).await;
        self.resolve(conversation_id, &ids).await
    }

    /// Users currently typing, without `user_id`
    pub async fn typing_users_except(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Vec<User> {
        let ids: Vec<UserId> = self
            .fresh_members(conversation_id)
            .await
            .into_iter()
            .filter(|id| *id != user_id)
            .collect();
        self.resolve(conversation_id, &ids).await
    }

    /// Drop all typing state of a conversation
    pub async fn clear_conversation(&self, conversation_id: ConversationId) -> RealtimeResult<()> {
        self.ctx
            .store()
            .delete(&typing_key(conversation_id))
            .await?;
        Ok(())
    }

    /// Human readable indicator text, `None` when nobody is typing
    #[must_use]
    pub fn summary(users: &[User]) -> Option<String> {
        match users {
            [] => None,
            [one] => Some(format!("{} is typing...", one.name)),
            [first, second] => Some(format!("{} and {} are typing...", first.name, second.name)),
            [first, rest @ ..] => Some(format!(
                "{} and {} others are typing...",
                first.name,
                rest.len()
            )),
        }
    }

    fn is_fresh(&self, score: f64) -> bool {
        let cutoff = (self.ctx.clock().epoch_seconds()
            - i64::try_from(self.ctx.typing_ttl_seconds()).unwrap_or(i64::MAX)) as f64;
        score >= cutoff
    }

    async fn fresh_members(&self, conversation_id: ConversationId) -> Vec<UserId> {
        match self
            .ctx
            .store()
            .zrange(&typing_key(conversation_id), 0, -1)
            .await
        {
            Ok(members) => members
                .into_iter()
                .filter(|(_, score)| self.is_fresh(*score))
                .filter_map(|(member, _)| UserId::parse(&member).ok())
                .collect(),
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to read typing state");
                Vec::new()
            }
        }
    }

    async fn resolve(&self, conversation_id: ConversationId, ids: &[UserId]) -> Vec<User> {
        if ids.is_empty() {
            return Vec::new();
        }
        match self.ctx.directory().find_users(ids).await {
            Ok(users) => users,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to resolve typing users");
                Vec::new()
            }
        }
    }
}
