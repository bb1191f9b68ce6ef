//! Subscribe (op 3) and Unsubscribe (op 4) handlers

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{ChannelPayload, CloseCode, GatewayMessage};
use crate::server::GatewayState;
use huddle_core::ChannelName;
use huddle_realtime::ChannelAuthorizer;
use std::sync::Arc;

/// Handles channel subscription requests
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    /// Run the channel through the authorization gate and join it on success.
    ///
    /// The reply echoes the channel name the client sent.
    pub async fn subscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ChannelPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let user_id = connection
            .user_id()
            .ok_or(HandlerError::NotAuthenticated)?;

        let reply = match ChannelAuthorizer::new(state.realtime())
            .authorize(user_id, &payload.channel)
            .await
        {
            Ok(channel) => {
                if state
                    .connection_manager()
                    .subscribe_to_channel(connection.session_id(), channel)
                {
                    state.sync_channel(channel);
                }
                GatewayMessage::subscription_succeeded(payload.channel)
            }
            Err(_) => GatewayMessage::subscription_denied(payload.channel),
        };

        connection
            .send(reply)
            .await
            .map_err(|e| HandlerError::Internal(format!("Failed to send subscription reply: {e}")))?;

        Ok(None)
    }

    /// Leave a channel. Unknown or unjoined channels are ignored.
    pub async fn unsubscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ChannelPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let Ok(channel) = ChannelName::parse(&payload.channel) else {
            tracing::debug!(
                session_id = %connection.session_id(),
                channel = %payload.channel,
                "Unsubscribe from unrecognized channel ignored"
            );
            return Ok(None);
        };

        if state
            .connection_manager()
            .unsubscribe_from_channel(connection.session_id(), &channel)
        {
            state.sync_channel(channel);
        }

        Ok(None)
    }
}
