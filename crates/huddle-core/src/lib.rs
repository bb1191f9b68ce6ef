//! # huddle-core
//!
//! Domain layer for the real-time fan-out core: typed ids, user/workspace/conversation
//! records, wire channel naming, the broadcast event catalogue, the clock abstraction,
//! and the `Directory` port used for membership checks.
//! This crate has zero dependencies on infrastructure (database, cache, web framework).

pub mod clock;
pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::{Conversation, User};
pub use error::DomainError;
pub use events::{
    ActorRef, ConversationRef, EventName, MessageDeletedPayload, MessagePayload,
    NotificationPayload, PresenceChangedPayload, ReactionAddedPayload, ReactionPayload,
    ReactionRemovedPayload, StoppedTypingPayload, TypingPayload, UserStatusPayload,
};
pub use traits::{Directory, MemoryDirectory, RepoResult};
pub use value_objects::{
    ChannelFamily, ChannelName, ChannelParseError, ConversationId, IdParseError, MessageId, UserId,
    WorkspaceId,
};
