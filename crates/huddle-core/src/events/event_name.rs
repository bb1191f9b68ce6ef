//! Broadcast event names
//!
//! These strings go out verbatim in the `t` field of dispatch frames. Both dotted and
//! hyphenated forms exist and clients match on them exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::ChannelFamily;

/// Every event the fan-out core publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    // Message events
    #[serde(rename = "message.created")]
    MessageCreated,
    #[serde(rename = "message.updated")]
    MessageUpdated,
    #[serde(rename = "message.deleted")]
    MessageDeleted,

    // Reaction events
    #[serde(rename = "reaction.added")]
    ReactionAdded,
    #[serde(rename = "reaction.removed")]
    ReactionRemoved,

    // Typing events
    #[serde(rename = "user.typing")]
    UserTyping,
    #[serde(rename = "user.stopped-typing")]
    UserStoppedTyping,

    // Presence and status events
    #[serde(rename = "presence.user.online")]
    PresenceOnline,
    #[serde(rename = "presence.user.offline")]
    PresenceOffline,
    #[serde(rename = "user.status.changed")]
    UserStatusChanged,

    // Personal events
    #[serde(rename = "notification.created")]
    NotificationCreated,
}

impl EventName {
    /// All event names, in catalogue order
    pub const ALL: [Self; 11] = [
        Self::MessageCreated,
        Self::MessageUpdated,
        Self::MessageDeleted,
        Self::ReactionAdded,
        Self::ReactionRemoved,
        Self::UserTyping,
        Self::UserStoppedTyping,
        Self::PresenceOnline,
        Self::PresenceOffline,
        Self::UserStatusChanged,
        Self::NotificationCreated,
    ];

    /// Get the wire string of the event
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageCreated => "message.created",
            Self::MessageUpdated => "message.updated",
            Self::MessageDeleted => "message.deleted",
            Self::ReactionAdded => "reaction.added",
            Self::ReactionRemoved => "reaction.removed",
            Self::UserTyping => "user.typing",
            Self::UserStoppedTyping => "user.stopped-typing",
            Self::PresenceOnline => "presence.user.online",
            Self::PresenceOffline => "presence.user.offline",
            Self::UserStatusChanged => "user.status.changed",
            Self::NotificationCreated => "notification.created",
        }
    }

    /// Parse an event name from its wire string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == s)
    }

    /// The channel family this event is published on
    #[must_use]
    pub const fn family(self) -> ChannelFamily {
        match self {
            Self::MessageCreated
            | Self::MessageUpdated
            | Self::MessageDeleted
            | Self::ReactionAdded
            | Self::ReactionRemoved
            | Self::UserTyping
            | Self::UserStoppedTyping => ChannelFamily::Conversation,
            Self::PresenceOnline | Self::PresenceOffline | Self::UserStatusChanged => {
                ChannelFamily::Workspace
            }
            Self::NotificationCreated => ChannelFamily::User,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EventName> for String {
    fn from(event: EventName) -> Self {
        event.as_str().to_string()
    }
}
