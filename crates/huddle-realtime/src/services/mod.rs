//! Fan-out services
//!
//! Each service borrows the shared [`RealtimeContext`] for the duration of a call
//! and holds no state of its own.

pub mod authorization;
pub mod broadcaster;
pub mod context;
pub mod error;
pub mod presence;
pub mod typing;

pub use authorization::ChannelAuthorizer;
pub use broadcaster::{BroadcastResult, EventBroadcaster};
pub use context::{RealtimeContext, RealtimeContextBuilder};
pub use error::{AuthorizationDenied, BroadcastError, RealtimeError, RealtimeResult};
pub use presence::{MemberPresence, PresenceTracker};
pub use typing::TypingTracker;
