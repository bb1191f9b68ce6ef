//! Channel authorization gate
//!
//! Each subscription attempt is checked once against live membership and either
//! granted or denied. Every denial looks the same to the client, whether the
//! channel was malformed, the entity does not exist, or the user is not a member.

use huddle_core::{ChannelName, UserId};
use tracing::{debug, instrument, warn};

use super::context::RealtimeContext;
use super::error::AuthorizationDenied;

/// Channel authorization gate
pub struct ChannelAuthorizer<'a> {
    ctx: &'a RealtimeContext,
}

impl<'a> ChannelAuthorizer<'a> {
    /// Create a new ChannelAuthorizer
    pub fn new(ctx: &'a RealtimeContext) -> Self {
        Self { ctx }
    }

    /// Decide whether `user_id` may subscribe to the wire channel `channel`.
    ///
    /// On success returns the canonical channel, so the legacy personal alias comes
    /// back as `private-user.{id}`.
    #[instrument(skip(self))]
    pub async fn authorize(
        &self,
        user_id: UserId,
        channel: &str,
    ) -> Result<ChannelName, AuthorizationDenied> {
        let Ok(parsed) = ChannelName::parse(channel) else {
            return Err(self.deny(user_id, channel, "unrecognized channel"));
        };

        let granted = match parsed {
            ChannelName::Conversation(conversation_id) => self
                .ctx
                .directory()
                .is_conversation_member(conversation_id, user_id)
                .await,
            ChannelName::Workspace(workspace_id) => self
                .ctx
                .directory()
                .is_workspace_member(workspace_id, user_id)
                .await,
            ChannelName::User(owner) => Ok(owner == user_id),
        };

        match granted {
            Ok(true) => {
                debug!(user_id = %user_id, channel = %parsed, "Subscription granted");
                Ok(parsed)
            }
            Ok(false) => Err(self.deny(user_id, channel, "not a member")),
            Err(e) => {
                warn!(user_id = %user_id, channel = %channel, error = %e, "Membership lookup failed");
                Err(self.deny(user_id, channel, "membership lookup failed"))
            }
        }
    }

    fn deny(&self, user_id: UserId, channel: &str, reason: &str) -> AuthorizationDenied {
        warn!(user_id = %user_id, channel = %channel, reason = %reason, "Subscription denied");
        AuthorizationDenied
    }
}
