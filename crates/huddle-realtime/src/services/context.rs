//! Realtime context - dependency container for the fan-out services
//!
//! Holds the ephemeral store, the membership directory, the transport, the clock,
//! and the configured TTL windows.

use std::sync::Arc;

use huddle_cache::SharedStore;
use huddle_common::{BroadcastConfig, PresenceConfig};
use huddle_core::{Clock, Directory, SystemClock};

use super::error::{RealtimeError, RealtimeResult};
use crate::transport::SharedTransport;

/// Shared dependencies of the presence, typing, broadcast, and authorization services
///
/// Cheap to clone; every field is reference counted or `Copy`.
#[derive(Clone)]
pub struct RealtimeContext {
    store: SharedStore,
    directory: Arc<dyn Directory>,
    transport: SharedTransport,
    clock: Arc<dyn Clock>,
    presence: PresenceConfig,
    broadcast: BroadcastConfig,
}

impl RealtimeContext {
    /// Create a context from its parts
    #[must_use]
    pub fn new(
        store: SharedStore,
        directory: Arc<dyn Directory>,
        transport: SharedTransport,
        clock: Arc<dyn Clock>,
        presence: PresenceConfig,
        broadcast: BroadcastConfig,
    ) -> Self {
        Self {
            store,
            directory,
            transport,
            clock,
            presence,
            broadcast,
        }
    }

    /// Start building a context
    #[must_use]
    pub fn builder() -> RealtimeContextBuilder {
        RealtimeContextBuilder::new()
    }

    /// Get the ephemeral store
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Get the membership directory
    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// Get the transport
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// Get the clock
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Lifetime of a presence entry without refresh
    pub fn presence_ttl_seconds(&self) -> u64 {
        self.presence.ttl_seconds
    }

    /// Freshness window of a typing signal
    pub fn typing_ttl_seconds(&self) -> u64 {
        self.presence.typing_ttl_seconds
    }

    /// Whether malformed broadcast channels are reported as errors
    pub fn strict_channels(&self) -> bool {
        self.broadcast.strict_channels
    }
}

impl std::fmt::Debug for RealtimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeContext")
            .field("store", &self.store)
            .field("directory", &"dyn Directory")
            .field("transport", &self.transport)
            .field("clock", &self.clock)
            .field("presence", &self.presence)
            .field("broadcast", &self.broadcast)
            .finish()
    }
}

/// Builder for creating `RealtimeContext`
///
/// Store, directory, and transport are required. The clock defaults to the system
/// clock and the windows to their configured defaults.
#[derive(Default)]
pub struct RealtimeContextBuilder {
    store: Option<SharedStore>,
    directory: Option<Arc<dyn Directory>>,
    transport: Option<SharedTransport>,
    clock: Option<Arc<dyn Clock>>,
    presence: PresenceConfig,
    broadcast: BroadcastConfig,
}

impl RealtimeContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn presence(mut self, presence: PresenceConfig) -> Self {
        self.presence = presence;
        self
    }

    #[must_use]
    pub fn broadcast(mut self, broadcast: BroadcastConfig) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Build the `RealtimeContext`
    ///
    /// # Errors
    /// Returns `RealtimeError::MissingDependency` if a required dependency is missing
    pub fn build(self) -> RealtimeResult<RealtimeContext> {
        Ok(RealtimeContext::new(
            self.store.ok_or(RealtimeError::MissingDependency("store"))?,
            self.directory
                .ok_or(RealtimeError::MissingDependency("directory"))?,
            self.transport
                .ok_or(RealtimeError::MissingDependency("transport"))?,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.presence,
            self.broadcast,
        ))
    }
}
