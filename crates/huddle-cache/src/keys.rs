//! Storage key layout for presence and typing state.
//!
//! - `presence:user:{user_id}` holds a JSON [`PresenceEntry`] with a TTL; the key
//!   existing is what "online" means
//! - `presence:workspace:{workspace_id}` is a set of candidate user ids
//! - `typing:conv:{conversation_id}` is a sorted set of user ids scored by the epoch
//!   second of their last typing signal

use chrono::{DateTime, Utc};
use huddle_core::{ConversationId, UserId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Key prefix for per-user presence entries
pub const PRESENCE_USER_PREFIX: &str = "presence:user:";
/// Key prefix for workspace candidate sets
pub const PRESENCE_WORKSPACE_PREFIX: &str = "presence:workspace:";
/// Key prefix for per-conversation typing collections
pub const TYPING_PREFIX: &str = "typing:conv:";

/// Key of a user's presence entry
#[must_use]
pub fn presence_user_key(user_id: UserId) -> String {
    format!("{PRESENCE_USER_PREFIX}{user_id}")
}

/// Key of a workspace's candidate set
#[must_use]
pub fn presence_workspace_key(workspace_id: WorkspaceId) -> String {
    format!("{PRESENCE_WORKSPACE_PREFIX}{workspace_id}")
}

/// Key of a conversation's typing collection
#[must_use]
pub fn typing_key(conversation_id: ConversationId) -> String {
    format!("{TYPING_PREFIX}{conversation_id}")
}

/// Value stored under `presence:user:{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub last_seen: DateTime<Utc>,
}

impl PresenceEntry {
    #[must_use]
    pub fn new(user_id: UserId, workspace_id: WorkspaceId, last_seen: DateTime<Utc>) -> Self {
        Self {
            user_id,
            workspace_id,
            last_seen,
        }
    }

    /// Serialize to the stored JSON form
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the stored JSON form
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
