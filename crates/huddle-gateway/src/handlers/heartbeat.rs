//! Heartbeat handler (op 1)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage};
use crate::server::GatewayState;
use huddle_realtime::PresenceTracker;
use std::sync::Arc;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Acknowledge a heartbeat and keep the user's presence alive.
    ///
    /// A presence entry that already lapsed is written again rather than left absent.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        last_sequence: Option<u64>,
    ) -> HandlerResult<Option<CloseCode>> {
        connection.record_heartbeat();

        tracing::trace!(
            session_id = %connection.session_id(),
            client_seq = ?last_sequence,
            server_seq = connection.current_sequence(),
            "Heartbeat received"
        );

        if let Err(e) = connection.send(GatewayMessage::heartbeat_ack()).await {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to send heartbeat ACK"
            );
            return Err(HandlerError::Internal(
                "Failed to send heartbeat ACK".to_string(),
            ));
        }

        let Some(identity) = connection.identity() else {
            return Ok(None);
        };

        let presence = PresenceTracker::new(state.realtime());
        match presence.refresh(identity.user.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(user_id = %identity.user.id, "Presence lapsed, marking online again");
                if let Err(e) = presence
                    .mark_online(&identity.user, identity.workspace_id)
                    .await
                {
                    tracing::warn!(user_id = %identity.user.id, error = %e, "Presence not restored");
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %identity.user.id, error = %e, "Presence refresh failed");
            }
        }

        Ok(None)
    }
}
