//! Test helpers for integration tests
//!
//! Provides an in-process world over a manual clock, a gateway server on an
//! ephemeral port, and a small WebSocket client speaking the gateway protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures_util::{SinkExt, StreamExt};
use huddle_cache::MemoryStore;
use huddle_common::{AppConfig, JwtService};
use huddle_core::{ChannelName, ManualClock, MemoryDirectory, UserId};
use huddle_gateway::broadcast::LocalTransport;
use huddle_gateway::connection::{ConnectionManager, OutboundFrame};
use huddle_gateway::protocol::GatewayMessage;
use huddle_gateway::{create_app, GatewayState};
use huddle_realtime::{
    ChannelAuthorizer, EventBroadcaster, PresenceTracker, RealtimeContext, TypingTracker,
};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{seeded_directory, TEST_JWT_SECRET, WORKSPACE};

/// How long a client waits for a frame it expects
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for a single-node gateway without Postgres or Redis
pub fn test_config() -> Result<AppConfig> {
    Ok(AppConfig::from_lookup(|key| match key {
        "APP_ENV" => Some("development".to_string()),
        "GATEWAY_PORT" => Some("0".to_string()),
        "DATABASE_URL" => Some("postgres://unused/huddle".to_string()),
        "JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
        _ => None,
    })?)
}

/// Access token for a fixture user
pub fn token_for(user_id: i64) -> Result<String> {
    Ok(JwtService::new(TEST_JWT_SECRET, 900).issue_access_token(UserId::new(user_id))?)
}

/// The real-time core wired over memory state and a manual clock.
///
/// Events reach whatever was registered through [`World::listen`].
pub struct World {
    pub ctx: RealtimeContext,
    pub clock: ManualClock,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub connections: Arc<ConnectionManager>,
}

impl World {
    pub fn new() -> Result<Self> {
        let clock = ManualClock::default();
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let directory = seeded_directory();
        let connections = ConnectionManager::new_shared();
        let config = test_config()?;

        let ctx = RealtimeContext::builder()
            .store(store.clone())
            .directory(directory.clone())
            .transport(Arc::new(LocalTransport::new(connections.clone())))
            .clock(Arc::new(clock.clone()))
            .presence(config.presence)
            .broadcast(config.broadcast)
            .build()?;

        Ok(Self {
            ctx,
            clock,
            store,
            directory,
            connections,
        })
    }

    pub fn presence(&self) -> PresenceTracker<'_> {
        PresenceTracker::new(&self.ctx)
    }

    pub fn typing(&self) -> TypingTracker<'_> {
        TypingTracker::new(&self.ctx)
    }

    pub fn broadcaster(&self) -> EventBroadcaster<'_> {
        EventBroadcaster::new(&self.ctx)
    }

    pub fn gate(&self) -> ChannelAuthorizer<'_> {
        ChannelAuthorizer::new(&self.ctx)
    }

    /// Register a socket-less session listening on `channel`
    pub fn listen(&self, session_id: &str, channel: ChannelName) -> mpsc::Receiver<OutboundFrame> {
        let (tx, rx) = mpsc::channel(64);
        self.connections.add_connection(session_id.to_string(), tx);
        self.connections.subscribe_to_channel(session_id, channel);
        rx
    }
}

/// Every message frame queued so far
pub fn drain(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<GatewayMessage> {
    let mut messages = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let OutboundFrame::Message(message) = frame {
            messages.push(message);
        }
    }
    messages
}

/// Gateway server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub state: GatewayState,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a single-node gateway over memory state
    pub async fn start() -> Result<Self> {
        let config = test_config()?;
        let store = Arc::new(MemoryStore::new());
        let directory = seeded_directory();
        let connections = ConnectionManager::new_shared();

        let realtime = RealtimeContext::builder()
            .store(store.clone())
            .directory(directory.clone())
            .transport(Arc::new(LocalTransport::new(connections.clone())))
            .presence(config.presence)
            .broadcast(config.broadcast)
            .build()?;

        let state = GatewayState::new(
            realtime,
            JwtService::new(TEST_JWT_SECRET, 900),
            connections,
            None,
            config,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = create_app(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {e}");
            }
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            state,
            store,
            directory,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket endpoint
    pub fn ws_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Connect, identify into the fixture workspace, and return the client
    pub async fn connect_as(&self, user_id: i64) -> Result<WsClient> {
        let mut client = WsClient::connect(self).await?;
        let ready = client.identify(&token_for(user_id)?, WORKSPACE).await?;
        if ready["op"] != 8 {
            bail!("expected Ready, got {ready}");
        }
        Ok(client)
    }
}

/// Minimal gateway client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// The Hello frame received on connect
    pub hello: Value,
}

impl WsClient {
    /// Open a socket and read the Hello frame
    pub async fn connect(server: &TestServer) -> Result<Self> {
        let (stream, _) = connect_async(server.ws_url()).await?;
        let mut client = Self {
            stream,
            hello: Value::Null,
        };
        client.hello = client.recv().await?;
        Ok(client)
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send a JSON frame
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.send_text(frame.to_string()).await
    }

    /// Next text frame as JSON
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow!("timed out waiting for a frame"))?;
            match next {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(frame))) => bail!("socket closed: {frame:?}"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => bail!("socket ended"),
            }
        }
    }

    /// Assert that no text frame arrives within `window`
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => bail!("unexpected frame: {text}"),
            Ok(other) => bail!("unexpected socket event: {other:?}"),
        }
    }

    /// Wait for the server to close the socket and return the close code
    pub async fn close_code(&mut self) -> Result<Option<u16>> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow!("timed out waiting for close"))?;
            match next {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }

    /// Send Identify and return the reply
    pub async fn identify(&mut self, token: &str, workspace_id: i64) -> Result<Value> {
        self.send(json!({"op": 2, "d": {"token": token, "workspace_id": workspace_id}}))
            .await?;
        self.recv().await
    }

    /// Send Subscribe and return the reply
    pub async fn subscribe(&mut self, channel: &str) -> Result<Value> {
        self.send(json!({"op": 3, "d": {"channel": channel}})).await?;
        self.recv().await
    }

    /// Send a typing signal
    pub async fn typing(&mut self, conversation_id: i64, typing: bool) -> Result<()> {
        self.send(json!({"op": 5, "d": {"conversation_id": conversation_id, "typing": typing}}))
            .await
    }

    /// Close the socket from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
