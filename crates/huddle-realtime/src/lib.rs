//! # huddle-realtime
//!
//! The real-time fan-out core: presence tracking, typing indicators, event
//! broadcast onto wire channels, and the channel authorization gate.
//!
//! Every service borrows a [`RealtimeContext`], which owns the ephemeral store, the
//! membership directory, the transport, and the clock.
//!
//! ## Example
//!
//! ```ignore
//! use huddle_realtime::{PresenceTracker, RealtimeContext};
//!
//! let ctx = RealtimeContext::builder()
//!     .store(store)
//!     .directory(directory)
//!     .transport(transport)
//!     .build()?;
//!
//! PresenceTracker::new(&ctx).mark_online(&user, workspace_id).await?;
//! ```

pub mod services;
pub mod transport;

pub use services::{
    AuthorizationDenied, BroadcastError, BroadcastResult, ChannelAuthorizer, EventBroadcaster,
    MemberPresence, PresenceTracker, RealtimeContext, RealtimeContextBuilder, RealtimeError,
    RealtimeResult, TypingTracker,
};
pub use transport::{
    RecordedFrame, RecordingTransport, RedisTransport, SharedTransport, Transport,
    TransportError, TransportResult,
};
