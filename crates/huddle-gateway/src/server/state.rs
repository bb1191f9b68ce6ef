//! Gateway state
//!
//! Application state for the gateway server.

use crate::broadcast::EventDispatcher;
use crate::connection::ConnectionManager;
use huddle_common::{AppConfig, JwtService};
use huddle_core::ChannelName;
use huddle_realtime::RealtimeContext;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Trackers, gate, and broadcaster wiring
    realtime: Arc<RealtimeContext>,
    /// Access token verification
    jwt: Arc<JwtService>,
    /// Connection manager for WebSocket connections
    connection_manager: Arc<ConnectionManager>,
    /// Redis fan-out, absent on a single node
    event_dispatcher: Option<Arc<EventDispatcher>>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        realtime: RealtimeContext,
        jwt: JwtService,
        connection_manager: Arc<ConnectionManager>,
        event_dispatcher: Option<Arc<EventDispatcher>>,
        config: AppConfig,
    ) -> Self {
        Self {
            realtime: Arc::new(realtime),
            jwt: Arc::new(jwt),
            connection_manager,
            event_dispatcher,
            config: Arc::new(config),
        }
    }

    /// Get the realtime context
    pub fn realtime(&self) -> &RealtimeContext {
        &self.realtime
    }

    /// Get the JWT service
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Align the node's Redis subscription with the channel's local listeners.
    /// Called after a subscribe filled or an unsubscribe emptied the channel.
    pub fn sync_channel(&self, channel: ChannelName) {
        if let Some(dispatcher) = &self.event_dispatcher {
            if let Err(e) = dispatcher.sync_channel(channel) {
                tracing::warn!(channel = %channel, error = %e, "Redis subscription sync failed");
            }
        }
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("event_dispatcher", &self.event_dispatcher)
            .field("config", &"AppConfig")
            .finish()
    }
}
