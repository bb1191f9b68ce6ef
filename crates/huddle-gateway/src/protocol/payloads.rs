//! Payload definitions
//!
//! The `d` field of each non-dispatch frame.

use huddle_core::{ConversationId, UserId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Default heartbeat interval (30 seconds, half the default presence window)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 30_000;

    /// Create a new Hello payload with default interval
    #[must_use]
    pub fn new() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Create a Hello payload with custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Access token, optionally prefixed with `Bearer `
    pub token: String,
    /// Workspace the session is present in
    pub workspace_id: WorkspaceId,
}

/// Payload for op 8 (Ready)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
}

/// Payload for op 3 (Subscribe) and op 4 (Unsubscribe)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPayload {
    /// Wire channel name, e.g. `private-conversation.42`
    pub channel: String,
}

/// Payload for op 5 (Typing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSignalPayload {
    pub conversation_id: ConversationId,
    /// `true` when typing started, `false` when it stopped
    pub typing: bool,
}
