//! Event broadcaster
//!
//! Turns domain events into channel-scoped frames and hands them to the transport.
//! Callers publish only after the triggering write is committed. Delivery is
//! fire-and-forget: a transport failure is logged here and never reaches the caller.

use huddle_cache::PubSubEvent;
use huddle_core::{
    ChannelName, ConversationId, EventName, MessageDeletedPayload, MessageId, MessagePayload,
    NotificationPayload, ReactionAddedPayload, ReactionPayload, ReactionRemovedPayload, UserId,
    UserStatusPayload,
};
use serde::Serialize;
use tracing::{instrument, warn};

use super::context::RealtimeContext;
use super::error::BroadcastError;

/// Result type for broadcaster operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Event broadcaster
pub struct EventBroadcaster<'a> {
    ctx: &'a RealtimeContext,
}

impl<'a> EventBroadcaster<'a> {
    /// Create a new EventBroadcaster
    pub fn new(ctx: &'a RealtimeContext) -> Self {
        Self { ctx }
    }

    /// Publish an event on raw wire channel names.
    ///
    /// Names outside the known families, or of a family the event does not belong
    /// to, are errors in strict mode and are logged and skipped otherwise. Returns
    /// the number of channels the frame was handed off on.
    #[instrument(skip(self, channels, payload, except_session), fields(event = %event))]
    pub async fn publish<P: Serialize + ?Sized>(
        &self,
        channels: &[&str],
        event: EventName,
        payload: &P,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        let mut targets = Vec::with_capacity(channels.len());

        for raw in channels {
            match ChannelName::parse(raw) {
                Ok(channel) => targets.push(channel),
                Err(e) => self.reject(raw, &e.to_string())?,
            }
        }

        self.publish_to(&targets, event, payload, except_session)
            .await
    }

    /// Publish an event on already-typed channels
    pub async fn publish_to<P: Serialize + ?Sized>(
        &self,
        channels: &[ChannelName],
        event: EventName,
        payload: &P,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        let mut targets = Vec::with_capacity(channels.len());

        for channel in channels {
            if channel.family() == event.family() {
                targets.push(*channel);
            } else {
                self.reject(
                    &channel.name(),
                    &format!("{event} belongs on a {:?} channel", event.family()),
                )?;
            }
        }

        if targets.is_empty() {
            return Ok(0);
        }

        let data = serde_json::to_value(payload)?;
        let frame =
            PubSubEvent::new(event, data).except_session(except_session.map(str::to_owned));

        if let Err(e) = self.ctx.transport().deliver(&targets, &frame).await {
            warn!(event = %event, channels = targets.len(), error = %e, "Broadcast delivery failed");
            return Ok(0);
        }

        tracing::debug!(event = %event, channels = targets.len(), "Broadcast published");
        Ok(targets.len())
    }

    fn reject(&self, channel: &str, reason: &str) -> BroadcastResult<()> {
        if self.ctx.strict_channels() {
            return Err(BroadcastError::MalformedChannel(channel.to_string()));
        }
        warn!(channel = %channel, reason = %reason, "Dropping broadcast on malformed channel");
        Ok(())
    }

    // === Message events ===

    /// `message.created` on the message's conversation
    pub async fn message_created(
        &self,
        message: &MessagePayload,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        self.publish_to(
            &[ChannelName::conversation(message.conversation_id)],
            EventName::MessageCreated,
            message,
            except_session,
        )
        .await
    }

    /// `message.updated` on the message's conversation
    pub async fn message_updated(
        &self,
        message: &MessagePayload,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        self.publish_to(
            &[ChannelName::conversation(message.conversation_id)],
            EventName::MessageUpdated,
            message,
            except_session,
        )
        .await
    }

    /// `message.deleted` on the message's conversation
    pub async fn message_deleted(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        let payload = MessageDeletedPayload {
            message_id,
            conversation_id,
        };
        self.publish_to(
            &[ChannelName::conversation(conversation_id)],
            EventName::MessageDeleted,
            &payload,
            except_session,
        )
        .await
    }

    // === Reaction events ===

    /// `reaction.added` on the conversation holding the message
    pub async fn reaction_added(
        &self,
        conversation_id: ConversationId,
        reaction: ReactionPayload,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        self.publish_to(
            &[ChannelName::conversation(conversation_id)],
            EventName::ReactionAdded,
            &ReactionAddedPayload { reaction },
            except_session,
        )
        .await
    }

    /// `reaction.removed` on the conversation holding the message
    pub async fn reaction_removed(
        &self,
        conversation_id: ConversationId,
        reaction_id: i64,
        message_id: MessageId,
        except_session: Option<&str>,
    ) -> BroadcastResult<usize> {
        let payload = ReactionRemovedPayload {
            reaction_id,
            message_id,
        };
        self.publish_to(
            &[ChannelName::conversation(conversation_id)],
            EventName::ReactionRemoved,
            &payload,
            except_session,
        )
        .await
    }

    // === User-scoped events ===

    /// `notification.created` on the recipient's personal channel
    pub async fn notification_created(
        &self,
        recipient: UserId,
        notification: &NotificationPayload,
    ) -> BroadcastResult<usize> {
        self.publish_to(
            &[ChannelName::user(recipient)],
            EventName::NotificationCreated,
            notification,
            None,
        )
        .await
    }

    /// `user.status.changed` on every workspace the user belongs to
    pub async fn user_status_changed(&self, status: &UserStatusPayload) -> BroadcastResult<usize> {
        let workspaces = match self.ctx.directory().user_workspaces(status.user_id).await {
            Ok(workspaces) => workspaces,
            Err(e) => {
                warn!(user_id = %status.user_id, error = %e, "Failed to resolve workspaces for status change");
                return Ok(0);
            }
        };

        let channels: Vec<ChannelName> = workspaces
            .into_iter()
            .map(ChannelName::workspace)
            .collect();

        self.publish_to(&channels, EventName::UserStatusChanged, status, None)
            .await
    }
}

impl std::fmt::Debug for EventBroadcaster<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster").finish_non_exhaustive()
    }
}
