//! Event payload definitions
//!
//! Every payload carries the denormalized data (names, not just ids) a client needs
//! to render the event without another round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::User;
use crate::value_objects::{ConversationId, MessageId, UserId, WorkspaceId};

// === Shared references ===

/// Minimal user reference embedded in other payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for ActorRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Minimal conversation reference embedded in notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRef {
    pub id: ConversationId,
    pub name: Option<String>,
}

// === Presence ===

/// `presence.user.online` / `presence.user.offline`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChangedPayload {
    pub user_id: UserId,
    pub user_name: String,
    pub workspace_id: WorkspaceId,
    pub timestamp: DateTime<Utc>,
}

impl PresenceChangedPayload {
    #[must_use]
    pub fn new(user: &User, workspace_id: WorkspaceId, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id,
            user_name: user.name.clone(),
            workspace_id,
            timestamp,
        }
    }
}

/// `user.status.changed`
///
/// Field names are camelCase on the wire, unlike the other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusPayload {
    pub user_id: UserId,
    pub status: String,
    pub status_message: Option<String>,
    pub status_emoji: Option<String>,
    pub is_dnd: bool,
    pub is_online: bool,
}

// === Typing ===

/// `user.typing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingPayload {
    pub user_id: UserId,
    pub user_name: String,
    pub conversation_id: ConversationId,
}

/// `user.stopped-typing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppedTypingPayload {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

// === Messages ===

/// `message.created` / `message.updated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub user: ActorRef,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// `message.deleted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeletedPayload {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
}

// === Reactions ===

/// A persisted reaction with its author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub id: i64,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
    pub user: ActorRef,
}

/// `reaction.added`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAddedPayload {
    pub reaction: ReactionPayload,
}

/// `reaction.removed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRemovedPayload {
    pub reaction_id: i64,
    pub message_id: MessageId,
}

// === Notifications ===

/// `notification.created`, sent on the recipient's personal channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: ActorRef,
    pub conversation: ConversationRef,
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
