//! Redis Pub/Sub subscriber.
//!
//! The set of channels this node wants is kept next to the handle and is the only
//! source of truth: a background task owns the Redis connection, applies changes
//! to it as they come in, and replays the whole set after every reconnect. Frames
//! are decoded once and fanned out over a `broadcast` channel.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use huddle_core::ChannelName;
use parking_lot::Mutex;
use redis::aio::PubSub;
use redis::Client;
use tokio::sync::{broadcast, mpsc};

use crate::pubsub::PubSubEvent;

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Subscriber task has stopped")]
    Stopped,
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Frame received from Pub/Sub
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Channel the frame was published on
    pub channel: ChannelName,
    /// Decoded envelope
    pub event: PubSubEvent,
}

impl ReceivedMessage {
    /// Decode a raw Redis message; foreign channels and payloads yield `None`
    fn from_redis(channel_name: &str, payload: &str) -> Option<Self> {
        let channel = ChannelName::parse(channel_name).ok()?;
        let event = serde_json::from_str(payload).ok()?;
        Some(Self { channel, event })
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Frames buffered per receiver before it starts lagging
    pub broadcast_buffer: usize,
    /// Pause between reconnect attempts
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

type Wanted = Arc<Mutex<HashSet<ChannelName>>>;

/// Changes pushed to the connection task
#[derive(Debug)]
enum Command {
    Listen(Vec<ChannelName>),
    Forget(Vec<ChannelName>),
    Shutdown,
}

/// How a connection session ended
enum SessionEnd {
    Shutdown,
    Lost,
}

/// Redis Pub/Sub subscriber
#[derive(Debug)]
pub struct Subscriber {
    wanted: Wanted,
    frames: broadcast::Sender<ReceivedMessage>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscriber {
    /// Create a subscriber and spawn its connection task (requires a Tokio runtime)
    #[must_use]
    pub fn new(config: SubscriberConfig) -> Self {
        let (frames, _) = broadcast::channel(config.broadcast_buffer);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let wanted: Wanted = Arc::default();

        tokio::spawn(connection_task(
            config,
            wanted.clone(),
            frames.clone(),
            command_rx,
        ));

        Self {
            wanted,
            frames,
            commands,
        }
    }

    /// Start listening on channels. Takes effect after a reconnect as well.
    pub fn subscribe(&self, channels: &[ChannelName]) -> SubscriberResult<()> {
        let mut wanted = self.wanted.lock();
        let added: Vec<ChannelName> = channels.iter().copied().filter(|c| wanted.insert(*c)).collect();
        self.push(added, Command::Listen)
    }

    /// Stop listening on channels
    pub fn unsubscribe(&self, channels: &[ChannelName]) -> SubscriberResult<()> {
        let mut wanted = self.wanted.lock();
        let removed: Vec<ChannelName> = channels.iter().copied().filter(|c| wanted.remove(c)).collect();
        self.push(removed, Command::Forget)
    }

    /// Listen on `channel` exactly when `listen` says so.
    ///
    /// `listen` is evaluated under the wanted-set lock, so the last call to run sees
    /// the latest state no matter how callers interleave. Returns the decision.
    pub fn reconcile(&self, channel: ChannelName, listen: impl FnOnce() -> bool) -> SubscriberResult<bool> {
        let mut wanted = self.wanted.lock();
        let listen = listen();
        if listen {
            if wanted.insert(channel) {
                self.push(vec![channel], Command::Listen)?;
            }
        } else if wanted.remove(&channel) {
            self.push(vec![channel], Command::Forget)?;
        }
        Ok(listen)
    }

    /// Queue a change; callers hold the wanted-set lock so commands keep its order
    fn push(&self, channels: Vec<ChannelName>, command: fn(Vec<ChannelName>) -> Command) -> SubscriberResult<()> {
        if channels.is_empty() {
            return Ok(());
        }
        self.commands
            .send(command(channels))
            .map_err(|_| SubscriberError::Stopped)
    }

    /// Get a receiver for decoded frames
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.frames.subscribe()
    }

    /// Channels this node currently wants
    pub fn subscribed_channels(&self) -> Vec<ChannelName> {
        self.wanted.lock().iter().copied().collect()
    }

    /// Stop the connection task
    pub fn shutdown(&self) -> SubscriberResult<()> {
        self.commands
            .send(Command::Shutdown)
            .map_err(|_| SubscriberError::Stopped)
    }
}

async fn connection_task(
    config: SubscriberConfig,
    wanted: Wanted,
    frames: broadcast::Sender<ReceivedMessage>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let delay = Duration::from_millis(config.reconnect_delay_ms);

    loop {
        match session(&config, &wanted, &frames, &mut commands).await {
            Ok(SessionEnd::Shutdown) => {
                tracing::info!("Subscriber shutting down");
                return;
            }
            Ok(SessionEnd::Lost) => tracing::warn!("Pub/Sub connection lost, reconnecting"),
            Err(e) => tracing::error!(error = %e, "Subscriber error, reconnecting"),
        }
        tokio::time::sleep(delay).await;
    }
}

/// One connection's lifetime
async fn session(
    config: &SubscriberConfig,
    wanted: &Wanted,
    frames: &broadcast::Sender<ReceivedMessage>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> SubscriberResult<SessionEnd> {
    let client = Client::open(config.redis_url.as_str())?;
    let mut pubsub = client.get_async_pubsub().await?;

    // Commands queued while disconnected are already reflected in `wanted`
    while let Ok(command) = commands.try_recv() {
        if matches!(command, Command::Shutdown) {
            return Ok(SessionEnd::Shutdown);
        }
    }

    let restore = names(&wanted.lock().iter().copied().collect::<Vec<_>>());
    if !restore.is_empty() {
        pubsub.subscribe(&restore).await?;
    }
    tracing::info!(channels = restore.len(), "Subscriber connected to Redis");

    loop {
        let command = {
            let mut stream = pubsub.on_message();
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Ok(SessionEnd::Lost);
                    };
                    forward(frames, msg.get_channel_name(), &msg.get_payload::<String>().unwrap_or_default());
                    continue;
                }
                command = commands.recv() => command,
            }
        };

        match command {
            Some(Command::Listen(channels)) => apply(&mut pubsub, &channels, true).await?,
            Some(Command::Forget(channels)) => apply(&mut pubsub, &channels, false).await?,
            Some(Command::Shutdown) | None => return Ok(SessionEnd::Shutdown),
        }
    }
}

fn forward(frames: &broadcast::Sender<ReceivedMessage>, channel: &str, payload: &str) {
    match ReceivedMessage::from_redis(channel, payload) {
        Some(received) => {
            // No receivers is fine
            let _ = frames.send(received);
            tracing::trace!(channel = %channel, "Received Pub/Sub message");
        }
        None => tracing::warn!(channel = %channel, "Dropping undecodable Pub/Sub message"),
    }
}

async fn apply(pubsub: &mut PubSub, channels: &[ChannelName], listen: bool) -> SubscriberResult<()> {
    let names = names(channels);
    if listen {
        pubsub.subscribe(&names).await?;
    } else {
        pubsub.unsubscribe(&names).await?;
    }
    tracing::debug!(channels = ?names, listen, "Pub/Sub subscriptions updated");
    Ok(())
}

fn names(channels: &[ChannelName]) -> Vec<String> {
    channels.iter().map(ChannelName::name).collect()
}

/// Builder for subscriber
#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    config: SubscriberConfig,
}

impl SubscriberBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn broadcast_buffer(mut self, size: usize) -> Self {
        self.config.broadcast_buffer = size;
        self
    }

    #[must_use]
    pub fn reconnect_delay_ms(mut self, delay: u64) -> Self {
        self.config.reconnect_delay_ms = delay;
        self
    }

    /// Build and start the subscriber (requires a Tokio runtime)
    #[must_use]
    pub fn build(self) -> Subscriber {
        Subscriber::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::{ConversationId, WorkspaceId};

    fn unreachable_subscriber() -> Subscriber {
        SubscriberBuilder::new()
            .redis_url("redis://127.0.0.1:1")
            .reconnect_delay_ms(10)
            .build()
    }

    #[test]
    fn test_received_message_parsing() {
        let payload = r#"{"event":"message.created","data":{"id":1}}"#;
        let msg = ReceivedMessage::from_redis("private-conversation.42", payload).unwrap();

        assert_eq!(msg.channel, ChannelName::Conversation(ConversationId::new(42)));
        assert_eq!(msg.event.event, "message.created");
        assert!(msg.event.except_session.is_none());
    }

    #[test]
    fn test_received_message_rejects_garbage() {
        assert!(ReceivedMessage::from_redis("private-user.1", "invalid").is_none());
        assert!(ReceivedMessage::from_redis(
            "presence-lobby",
            r#"{"event":"message.created","data":{}}"#
        )
        .is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let builder = SubscriberBuilder::new()
            .redis_url("redis://localhost:6380")
            .broadcast_buffer(2048)
            .reconnect_delay_ms(500);

        assert_eq!(builder.config.redis_url, "redis://localhost:6380");
        assert_eq!(builder.config.broadcast_buffer, 2048);
        assert_eq!(builder.config.reconnect_delay_ms, 500);
    }

    #[tokio::test]
    async fn test_wanted_set_tracks_calls_while_disconnected() {
        let subscriber = unreachable_subscriber();
        let general = ChannelName::conversation(ConversationId::new(42));
        let workspace = ChannelName::workspace(WorkspaceId::new(1));

        subscriber.subscribe(&[general, workspace]).unwrap();
        subscriber.subscribe(&[general]).unwrap();
        subscriber.unsubscribe(&[workspace]).unwrap();

        assert_eq!(subscriber.subscribed_channels(), vec![general]);
        subscriber.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_follows_latest_decision() {
        let subscriber = unreachable_subscriber();
        let general = ChannelName::conversation(ConversationId::new(42));

        assert!(subscriber.reconcile(general, || true).unwrap());
        assert!(subscriber.reconcile(general, || true).unwrap());
        assert_eq!(subscriber.subscribed_channels(), vec![general]);

        assert!(!subscriber.reconcile(general, || false).unwrap());
        assert!(subscriber.subscribed_channels().is_empty());
        subscriber.shutdown().unwrap();
    }
}
