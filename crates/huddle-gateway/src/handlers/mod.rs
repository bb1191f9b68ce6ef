//! Op code handlers
//!
//! Handles incoming WebSocket messages based on their operation code.

mod error;
mod heartbeat;
mod identify;
mod subscription;
mod typing;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use subscription::SubscriptionHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        if !message.op.allowed_before_identify() && !connection.is_authenticated() {
            return Err(HandlerError::NotAuthenticated);
        }

        match message.op {
            OpCode::Identify => {
                let payload = message.as_identify().ok_or_else(|| invalid("Identify"))?;
                IdentifyHandler::handle(state, connection, payload).await
            }
            OpCode::Heartbeat => {
                let seq = message.as_heartbeat_seq().ok_or_else(|| invalid("Heartbeat"))?;
                HeartbeatHandler::handle(state, connection, seq).await
            }
            OpCode::Subscribe => {
                let payload = message.as_subscribe().ok_or_else(|| invalid("Subscribe"))?;
                SubscriptionHandler::subscribe(state, connection, payload).await
            }
            OpCode::Unsubscribe => {
                let payload = message
                    .as_unsubscribe()
                    .ok_or_else(|| invalid("Unsubscribe"))?;
                SubscriptionHandler::unsubscribe(state, connection, payload).await
            }
            OpCode::Typing => {
                let payload = message.as_typing().ok_or_else(|| invalid("Typing"))?;
                TypingHandler::handle(state, connection, payload).await
            }
            // Server ops never get past the is_client_op check
            _ => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}

fn invalid(op: &str) -> HandlerError {
    HandlerError::InvalidPayload(format!("Invalid {op} payload"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use huddle_cache::MemoryStore;
    use huddle_common::{AppConfig, JwtService};
    use huddle_core::{
        Conversation, ConversationId, MemoryDirectory, User, UserId, WorkspaceId,
    };
    use huddle_realtime::RealtimeContext;
    use tokio::sync::mpsc;

    use crate::broadcast::LocalTransport;
    use crate::connection::{Connection, ConnectionManager, OutboundFrame};
    use crate::protocol::{GatewayMessage, IdentifyPayload};
    use crate::server::GatewayState;

    use super::IdentifyHandler;

    const SECRET: &str = "gateway-test-secret";

    /// Single-node gateway over memory state.
    ///
    /// Alice (1) and Bob (2) share workspace 1 and conversation 42; only Bob is in 43.
    pub(crate) struct GatewayHarness {
        pub state: GatewayState,
        pub store: Arc<MemoryStore>,
        pub jwt: JwtService,
    }

    impl GatewayHarness {
        pub fn new() -> Self {
            let directory = Arc::new(MemoryDirectory::new());
            directory.add_user(User::new(1, "Alice"));
            directory.add_user(User::new(2, "Bob"));
            directory.join_workspace(WorkspaceId::new(1), UserId::new(1));
            directory.join_workspace(WorkspaceId::new(1), UserId::new(2));
            directory.add_conversation(Conversation::new(42, 1, Some("general".to_string())));
            directory.add_conversation(Conversation::new(43, 1, Some("random".to_string())));
            directory.join_conversation(ConversationId::new(42), UserId::new(1));
            directory.join_conversation(ConversationId::new(42), UserId::new(2));
            directory.join_conversation(ConversationId::new(43), UserId::new(2));

            let store = Arc::new(MemoryStore::new());
            let connections = ConnectionManager::new_shared();
            let realtime = RealtimeContext::builder()
                .store(store.clone())
                .directory(directory)
                .transport(Arc::new(LocalTransport::new(connections.clone())))
                .build()
                .unwrap();

            let config = AppConfig::from_lookup(|key| match key {
                "GATEWAY_PORT" => Some("0".to_string()),
                "DATABASE_URL" => Some("postgres://unused".to_string()),
                "JWT_SECRET" => Some(SECRET.to_string()),
                _ => None,
            })
            .unwrap();

            let state = GatewayState::new(
                realtime,
                JwtService::new(SECRET, 900),
                connections,
                None,
                config,
            );

            Self {
                state,
                store,
                jwt: JwtService::new(SECRET, 900),
            }
        }

        pub fn token(&self, user_id: i64) -> String {
            self.jwt.issue_access_token(UserId::new(user_id)).unwrap()
        }

        pub fn connect(&self, session_id: &str) -> (Arc<Connection>, mpsc::Receiver<OutboundFrame>) {
            let (tx, rx) = mpsc::channel(32);
            let conn = self
                .state
                .connection_manager()
                .add_connection(session_id.to_string(), tx);
            (conn, rx)
        }

        /// Connected and identified into workspace 1, with the Ready frame consumed
        pub async fn identified(
            &self,
            session_id: &str,
            user_id: i64,
        ) -> (Arc<Connection>, mpsc::Receiver<OutboundFrame>) {
            let (conn, mut rx) = self.connect(session_id);
            IdentifyHandler::handle(
                &self.state,
                &conn,
                IdentifyPayload {
                    token: self.token(user_id),
                    workspace_id: WorkspaceId::new(1),
                },
            )
            .await
            .unwrap();
            next_message(&mut rx).unwrap();
            (conn, rx)
        }
    }

    pub(crate) fn next_message(rx: &mut mpsc::Receiver<OutboundFrame>) -> Option<GatewayMessage> {
        match rx.try_recv() {
            Ok(OutboundFrame::Message(message)) => Some(message),
            _ => None,
        }
    }
}
