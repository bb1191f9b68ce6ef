//! Wire-level channel names.
//!
//! Clients subscribe to these names verbatim, so the formats are fixed:
//! - `private-conversation.{id}`
//! - `private-workspace.{id}`
//! - `private-user.{id}` (personal channel; `private-App.Models.User.{id}` is accepted
//!   as a legacy alias and normalizes to the same channel)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ids::{ConversationId, UserId, WorkspaceId};

/// Channel prefix for conversation-scoped events
pub const CONVERSATION_PREFIX: &str = "private-conversation.";
/// Channel prefix for workspace-scoped events
pub const WORKSPACE_PREFIX: &str = "private-workspace.";
/// Channel prefix for personal (per-user) events
pub const USER_PREFIX: &str = "private-user.";
/// Legacy personal channel prefix still used by older clients
pub const LEGACY_USER_PREFIX: &str = "private-App.Models.User.";

/// Error when a string does not name a recognized channel family
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelParseError {
    #[error("unrecognized channel family: {0}")]
    UnknownFamily(String),

    #[error("invalid id in channel name: {0}")]
    InvalidId(String),
}

/// The three channel families a name can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFamily {
    Conversation,
    Workspace,
    User,
}

/// A parsed, recognized channel name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelName {
    /// Events for one conversation (messages, reactions, typing)
    Conversation(ConversationId),
    /// Events for one workspace (presence, status)
    Workspace(WorkspaceId),
    /// Personal events for one user (notifications)
    User(UserId),
}

impl ChannelName {
    /// Create a conversation channel
    #[must_use]
    pub fn conversation(id: ConversationId) -> Self {
        Self::Conversation(id)
    }

    /// Create a workspace channel
    #[must_use]
    pub fn workspace(id: WorkspaceId) -> Self {
        Self::Workspace(id)
    }

    /// Create a personal channel
    #[must_use]
    pub fn user(id: UserId) -> Self {
        Self::User(id)
    }

    /// Family this channel belongs to
    #[must_use]
    pub fn family(&self) -> ChannelFamily {
        match self {
            Self::Conversation(_) => ChannelFamily::Conversation,
            Self::Workspace(_) => ChannelFamily::Workspace,
            Self::User(_) => ChannelFamily::User,
        }
    }

    /// Get the canonical wire name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Conversation(id) => format!("{CONVERSATION_PREFIX}{id}"),
            Self::Workspace(id) => format!("{WORKSPACE_PREFIX}{id}"),
            Self::User(id) => format!("{USER_PREFIX}{id}"),
        }
    }

    /// Parse a wire name. Unknown families are an error, never a catch-all.
    pub fn parse(name: &str) -> Result<Self, ChannelParseError> {
        if let Some(id) = name.strip_prefix(CONVERSATION_PREFIX) {
            return parse_id(name, id).map(|id| Self::Conversation(ConversationId::new(id)));
        }

        if let Some(id) = name.strip_prefix(WORKSPACE_PREFIX) {
            return parse_id(name, id).map(|id| Self::Workspace(WorkspaceId::new(id)));
        }

        if let Some(id) = name
            .strip_prefix(USER_PREFIX)
            .or_else(|| name.strip_prefix(LEGACY_USER_PREFIX))
        {
            return parse_id(name, id).map(|id| Self::User(UserId::new(id)));
        }

        Err(ChannelParseError::UnknownFamily(name.to_string()))
    }
}

fn parse_id(name: &str, raw: &str) -> Result<i64, ChannelParseError> {
    // Digits only: no sign, no whitespace
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChannelParseError::InvalidId(name.to_string()));
    }
    raw.parse::<i64>()
        .map_err(|_| ChannelParseError::InvalidId(name.to_string()))
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for ChannelName {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ChannelName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for ChannelName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
