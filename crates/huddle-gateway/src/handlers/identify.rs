//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, Identity};
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload, ReadyPayload};
use crate::server::GatewayState;
use huddle_realtime::PresenceTracker;
use std::sync::Arc;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Authenticate the socket, bind it to a workspace, mark the user online
    /// there, and answer Ready.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.is_authenticated() {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Client sent Identify while already authenticated"
            );
            return Ok(Some(CloseCode::AlreadyAuthenticated));
        }

        let token = payload
            .token
            .strip_prefix("Bearer ")
            .unwrap_or(&payload.token);

        let claims = state.jwt().validate_access_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Token validation failed");
            HandlerError::AuthenticationFailed(e.to_string())
        })?;

        let user_id = claims
            .user_id()
            .map_err(|e| HandlerError::AuthenticationFailed(e.to_string()))?;

        let directory = state.realtime().directory();
        let user = directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| HandlerError::AuthenticationFailed("User not found".to_string()))?;

        let workspace_id = payload.workspace_id;
        if !directory.is_workspace_member(workspace_id, user_id).await? {
            tracing::warn!(
                session_id = %connection.session_id(),
                user_id = %user_id,
                workspace_id = %workspace_id,
                "Identify into foreign workspace"
            );
            return Err(HandlerError::WorkspaceDenied);
        }

        let session_id = connection.session_id().to_string();
        let identity = Identity {
            user: user.clone(),
            workspace_id,
        };
        if !state
            .connection_manager()
            .authenticate_connection(&session_id, identity)
        {
            return Ok(Some(CloseCode::AlreadyAuthenticated));
        }

        if let Err(e) = PresenceTracker::new(state.realtime())
            .mark_online(&user, workspace_id)
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Presence not recorded on identify");
        }

        connection
            .send(GatewayMessage::ready(&ReadyPayload {
                session_id: session_id.clone(),
                user_id,
                workspace_id,
            }))
            .await
            .map_err(|e| HandlerError::Internal(format!("Failed to send READY: {e}")))?;

        tracing::info!(
            session_id = %session_id,
            user_id = %user_id,
            workspace_id = %workspace_id,
            "Client identified"
        );

        Ok(None)
    }
}
