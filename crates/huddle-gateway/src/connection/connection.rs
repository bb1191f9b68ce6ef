//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and its state.

use crate::protocol::{CloseCode, GatewayMessage};
use huddle_core::{ChannelName, User, UserId, WorkspaceId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection established, waiting for Identify
    Connecting,
    /// Successfully authenticated
    Connected,
    /// Connection is closed
    Disconnected,
}

/// Who the connection belongs to, fixed at Identify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: User,
    pub workspace_id: WorkspaceId,
}

/// Frame queued for the socket writer
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Message(GatewayMessage),
    /// Send a close frame and stop writing
    Close(CloseCode),
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique session ID
    session_id: String,

    /// Authenticated identity (None until Identify)
    identity: RwLock<Option<Identity>>,

    /// Current connection state
    state: RwLock<ConnectionState>,

    /// Queue drained by the socket writer
    sender: mpsc::Sender<OutboundFrame>,

    /// Last sequence number sent
    sequence: AtomicU64,

    /// Last heartbeat received
    last_heartbeat: RwLock<Instant>,

    /// Channels this connection is subscribed to
    channels: RwLock<HashSet<ChannelName>>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(session_id: String, sender: mpsc::Sender<OutboundFrame>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            identity: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            sequence: AtomicU64::new(0),
            last_heartbeat: RwLock::new(Instant::now()),
            channels: RwLock::new(HashSet::new()),
            created_at: Instant::now(),
        })
    }

    /// Generate a new session ID
    #[must_use]
    pub fn generate_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the identity (if authenticated)
    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().clone()
    }

    /// Get the user ID (if authenticated)
    pub fn user_id(&self) -> Option<UserId> {
        self.identity.read().as_ref().map(|identity| identity.user.id)
    }

    /// Bind the connection to an identity. Returns false if it already had one.
    pub fn identify(&self, identity: Identity) -> bool {
        let mut slot = self.identity.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(identity);
        *self.state.write() = ConnectionState::Connected;
        true
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Set the connection state
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Check if the connection is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.identity.read().is_some()
    }

    /// Get the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get the current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Record a heartbeat received
    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.write() = Instant::now();
    }

    /// Get time since last heartbeat
    pub fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.read().elapsed()
    }

    /// Add a channel subscription. Returns false if it was already there.
    pub fn add_channel(&self, channel: ChannelName) -> bool {
        self.channels.write().insert(channel)
    }

    /// Remove a channel subscription. Returns false if it was not there.
    pub fn remove_channel(&self, channel: &ChannelName) -> bool {
        self.channels.write().remove(channel)
    }

    /// Get all subscribed channels
    pub fn channels(&self) -> Vec<ChannelName> {
        self.channels.read().iter().copied().collect()
    }

    /// Check if subscribed to a channel
    pub fn is_subscribed_to(&self, channel: &ChannelName) -> bool {
        self.channels.read().contains(channel)
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Send a message to this connection
    pub async fn send(
        &self,
        message: GatewayMessage,
    ) -> Result<(), mpsc::error::SendError<OutboundFrame>> {
        self.sender.send(OutboundFrame::Message(message)).await
    }

    /// Try to send a message (non-blocking)
    pub fn try_send(
        &self,
        message: GatewayMessage,
    ) -> Result<(), mpsc::error::TrySendError<OutboundFrame>> {
        self.sender.try_send(OutboundFrame::Message(message))
    }

    /// Ask the writer to close the socket with `code`
    pub async fn close(&self, code: CloseCode) {
        if self.sender.send(OutboundFrame::Close(code)).await.is_err() {
            tracing::trace!(session_id = %self.session_id, "Writer already gone");
        }
    }

    /// Check if the sender channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id())
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .field("created_at", &self.created_at)
            .finish()
    }
}
