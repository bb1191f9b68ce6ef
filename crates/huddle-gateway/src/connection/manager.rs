//! Connection manager
//!
//! Tracks every live socket on this node, which user owns it, and which channels it
//! listens to. Delivery to local sockets happens here.

use super::{Connection, Identity, OutboundFrame};
use crate::protocol::GatewayMessage;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use huddle_cache::PubSubEvent;
use huddle_core::{ChannelName, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// What was left behind when a connection went away
#[derive(Debug, Clone)]
pub struct RemovedConnection {
    /// Identity of the socket, if it had identified
    pub identity: Option<Identity>,
    /// True when no other socket of the same user is left on this node
    pub last_user_session: bool,
    /// Channels that no longer have any local listener
    pub emptied_channels: Vec<ChannelName>,
}

/// Manages all active WebSocket connections
///
/// Uses `DashMap` for concurrent access to connection state.
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// User ID to session IDs mapping
    user_connections: DashMap<UserId, HashSet<String>>,

    /// Channel to session IDs mapping
    channel_connections: DashMap<ChannelName, HashSet<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
            channel_connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(
        &self,
        session_id: String,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections
            .insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection and drop it from every index
    pub fn remove_connection(&self, session_id: &str) -> Option<RemovedConnection> {
        let (_, connection) = self.connections.remove(session_id)?;
        let identity = connection.identity();

        let mut last_user_session = false;
        if let Some(identity) = &identity {
            if let Entry::Occupied(mut entry) = self.user_connections.entry(identity.user.id) {
                entry.get_mut().remove(session_id);
                if entry.get().is_empty() {
                    entry.remove();
                    last_user_session = true;
                }
            }
        }

        let emptied_channels = connection
            .channels()
            .into_iter()
            .filter(|channel| self.detach(session_id, *channel))
            .collect();

        tracing::debug!(session_id = %session_id, "Connection removed");

        Some(RemovedConnection {
            identity,
            last_user_session,
            emptied_channels,
        })
    }

    /// Get a connection by session ID
    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Authenticate a connection (link to user). False if unknown or already identified.
    pub fn authenticate_connection(&self, session_id: &str, identity: Identity) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };

        let user_id = identity.user.id;
        if !connection.identify(identity) {
            return false;
        }

        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(session_id.to_string());

        tracing::debug!(
            session_id = %session_id,
            user_id = %user_id,
            "Connection authenticated"
        );

        true
    }

    /// Subscribe a connection to a channel.
    ///
    /// Returns true when this is the first local listener of the channel.
    pub fn subscribe_to_channel(&self, session_id: &str, channel: ChannelName) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };
        if !connection.add_channel(channel) {
            return false;
        }

        let mut sessions = self.channel_connections.entry(channel).or_default();
        let first = sessions.is_empty();
        sessions.insert(session_id.to_string());

        tracing::trace!(
            session_id = %session_id,
            channel = %channel,
            "Connection subscribed to channel"
        );

        first
    }

    /// Unsubscribe a connection from a channel.
    ///
    /// Returns true when the channel has no local listener left.
    pub fn unsubscribe_from_channel(&self, session_id: &str, channel: &ChannelName) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };
        if !connection.remove_channel(channel) {
            return false;
        }

        tracing::trace!(
            session_id = %session_id,
            channel = %channel,
            "Connection unsubscribed from channel"
        );

        self.detach(session_id, *channel)
    }

    fn detach(&self, session_id: &str, channel: ChannelName) -> bool {
        match self.channel_connections.entry(channel) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().remove(session_id);
                if entry.get().is_empty() {
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Whether any local connection listens on the channel
    pub fn has_channel_listeners(&self, channel: &ChannelName) -> bool {
        self.channel_connections
            .get(channel)
            .is_some_and(|sessions| !sessions.is_empty())
    }

    /// Get all connections subscribed to a channel
    pub fn get_channel_connections(&self, channel: &ChannelName) -> Vec<Arc<Connection>> {
        self.collect(self.channel_connections.get(channel).map(|s| s.clone()))
    }

    fn collect(&self, sessions: Option<HashSet<String>>) -> Vec<Arc<Connection>> {
        sessions
            .unwrap_or_default()
            .iter()
            .filter_map(|sid| self.get_connection(sid))
            .collect()
    }

    /// Deliver an event to every local listener of `channel`, skipping the
    /// session named in `except_session`. Returns the number of sockets reached.
    pub fn deliver(&self, channel: &ChannelName, event: &PubSubEvent) -> usize {
        let wire_name = channel.name();
        let mut sent = 0;

        for conn in self.get_channel_connections(channel) {
            if event.except_session.as_deref() == Some(conn.session_id()) {
                continue;
            }

            let message = GatewayMessage::dispatch(
                event.event.clone(),
                conn.next_sequence(),
                wire_name.clone(),
                event.data.clone(),
            );

            match conn.try_send(message) {
                Ok(()) => sent += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id = %conn.session_id(),
                        channel = %channel,
                        event = %event.event,
                        "Outbound queue full, frame dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }

        tracing::trace!(
            channel = %channel,
            event = %event.event,
            sent = sent,
            "Event delivered to local connections"
        );

        sent
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of unique authenticated users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// Get the number of channels with local listeners
    pub fn channel_count(&self) -> usize {
        self.channel_connections.len()
    }

    /// Check if a session exists
    pub fn has_session(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .field("channels", &self.channel_connections.len())
            .finish()
    }
}
