//! Broadcast event catalogue - event names and their wire payloads

mod event_name;
mod payloads;

pub use event_name::EventName;
pub use payloads::{
    ActorRef, ConversationRef, MessageDeletedPayload, MessagePayload, NotificationPayload,
    PresenceChangedPayload, ReactionAddedPayload, ReactionPayload, ReactionRemovedPayload,
    StoppedTypingPayload, TypingPayload, UserStatusPayload,
};
