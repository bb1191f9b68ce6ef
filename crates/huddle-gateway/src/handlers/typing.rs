//! Typing handler (op 5)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, TypingSignalPayload};
use crate::server::GatewayState;
use huddle_realtime::TypingTracker;
use std::sync::Arc;

/// Handles typing signals
pub struct TypingHandler;

impl TypingHandler {
    /// Start or stop typing in a conversation the user belongs to.
    ///
    /// Signals for other conversations are dropped. The sender's own socket does not
    /// get the echo.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: TypingSignalPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let identity = connection
            .identity()
            .ok_or(HandlerError::NotAuthenticated)?;
        let user_id = identity.user.id;
        let conversation_id = payload.conversation_id;

        match state
            .realtime()
            .directory()
            .is_conversation_member(conversation_id, user_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    user_id = %user_id,
                    conversation_id = %conversation_id,
                    "Typing signal for foreign conversation dropped"
                );
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    conversation_id = %conversation_id,
                    error = %e,
                    "Membership lookup failed, typing signal dropped"
                );
                return Ok(None);
            }
        }

        let tracker = TypingTracker::new(state.realtime());
        let except = Some(connection.session_id());
        let recorded = if payload.typing {
            tracker.start(&identity.user, conversation_id, except).await
        } else {
            tracker.stop(user_id, conversation_id, except).await
        };

        if let Err(e) = recorded {
            tracing::warn!(
                user_id = %user_id,
                conversation_id = %conversation_id,
                error = %e,
                "Typing signal not recorded"
            );
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{next_message, GatewayHarness};
    use crate::handlers::SubscriptionHandler;
    use crate::protocol::{ChannelPayload, OpCode};
    use huddle_core::{ConversationId, UserId};

    fn signal(conversation_id: i64, typing: bool) -> TypingSignalPayload {
        TypingSignalPayload {
            conversation_id: ConversationId::new(conversation_id),
            typing,
        }
    }

    async fn join(h: &GatewayHarness, conn: &Arc<Connection>, name: &str) {
        SubscriptionHandler::subscribe(
            &h.state,
            conn,
            ChannelPayload {
                channel: name.to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_typing_reaches_others_but_not_sender() {
        let h = GatewayHarness::new();
        let (alice, mut alice_rx) = h.identified("alice", 1).await;
        let (bob, mut bob_rx) = h.identified("bob", 2).await;
        join(&h, &alice, "private-conversation.42").await;
        join(&h, &bob, "private-conversation.42").await;
        next_message(&mut alice_rx);
        next_message(&mut bob_rx);

        TypingHandler::handle(&h.state, &alice, signal(42, true))
            .await
            .unwrap();

        let frame = next_message(&mut bob_rx).unwrap();
        assert_eq!(frame.op, OpCode::Dispatch);
        assert_eq!(frame.t.as_deref(), Some("user.typing"));
        assert!(next_message(&mut alice_rx).is_none());

        let tracker = TypingTracker::new(h.state.realtime());
        assert!(
            tracker
                .is_typing(UserId::new(1), ConversationId::new(42))
                .await
        );

        TypingHandler::handle(&h.state, &alice, signal(42, false))
            .await
            .unwrap();
        assert_eq!(
            next_message(&mut bob_rx).unwrap().t.as_deref(),
            Some("user.stopped-typing")
        );
        assert!(
            !tracker
                .is_typing(UserId::new(1), ConversationId::new(42))
                .await
        );
    }

    #[tokio::test]
    async fn test_typing_in_foreign_conversation_is_dropped() {
        let h = GatewayHarness::new();
        let (alice, _rx) = h.identified("alice", 1).await;

        let outcome = TypingHandler::handle(&h.state, &alice, signal(43, true))
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert!(
            !TypingTracker::new(h.state.realtime())
                .is_typing(UserId::new(1), ConversationId::new(43))
                .await
        );
    }
}
