//! Value objects - immutable types that represent domain concepts

mod channel_name;
mod ids;

pub use channel_name::{ChannelFamily, ChannelName, ChannelParseError};
pub use ids::{ConversationId, IdParseError, MessageId, UserId, WorkspaceId};
