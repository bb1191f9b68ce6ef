//! Event dispatcher
//!
//! Pumps frames from Redis Pub/Sub into local sockets. A node listens only to
//! channels with at least one local subscriber; the gateway state opens and closes
//! them as subscriptions come and go.

use crate::connection::ConnectionManager;
use huddle_cache::{ReceivedMessage, Subscriber, SubscriberConfig, SubscriberResult};
use huddle_core::ChannelName;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Routes Redis Pub/Sub frames to WebSocket connections
pub struct EventDispatcher {
    connection_manager: Arc<ConnectionManager>,
    subscriber: Subscriber,
    running: AtomicBool,
}

impl EventDispatcher {
    /// Create a dispatcher and its subscriber. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(config: SubscriberConfig, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            subscriber: Subscriber::new(config),
            running: AtomicBool::new(false),
        }
    }

    /// Bring the Redis subscription for `channel` in line with its local listeners.
    ///
    /// Call after any change that may have emptied or filled the channel locally.
    /// Returns whether the node now listens on it.
    pub fn sync_channel(&self, channel: ChannelName) -> SubscriberResult<bool> {
        self.subscriber
            .reconcile(channel, || self.connection_manager.has_channel_listeners(&channel))
    }

    /// Channels this node is listening on
    pub fn listening(&self) -> Vec<ChannelName> {
        self.subscriber.subscribed_channels()
    }

    /// Spawn the pump task. A second call is a no-op.
    pub fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Event dispatcher is already running");
            return;
        }

        // Take the receiver before spawning so no frame slips past
        let receiver = self.subscriber.receiver();
        tokio::spawn(async move { self.pump(receiver).await });

        tracing::info!("Event dispatcher started");
    }

    /// Stop pumping and shut the subscriber down
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = self.subscriber.shutdown() {
            tracing::debug!(error = %e, "Subscriber already stopped");
        }
        tracing::info!("Event dispatcher stopped");
    }

    async fn pump(&self, mut receiver: tokio::sync::broadcast::Receiver<ReceivedMessage>) {
        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(msg) => self.route(&msg),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event dispatcher lagged behind, frames lost");
                }
                Err(RecvError::Closed) => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Event dispatcher loop ended");
    }

    fn route(&self, msg: &ReceivedMessage) {
        let sent = self.connection_manager.deliver(&msg.channel, &msg.event);
        tracing::trace!(channel = %msg.channel, event = %msg.event.event, sent, "Event dispatched");
    }

    /// Check if the dispatcher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        // The subscriber task would otherwise keep reconnecting
        let _ = self.subscriber.shutdown();
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("running", &self.is_running())
            .field("listening", &self.listening().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::ConversationId;
    use tokio::sync::mpsc;

    fn offline_dispatcher(manager: Arc<ConnectionManager>) -> Arc<EventDispatcher> {
        Arc::new(EventDispatcher::new(
            SubscriberConfig {
                redis_url: "redis://127.0.0.1:1".to_string(),
                reconnect_delay_ms: 10,
                ..Default::default()
            },
            manager,
        ))
    }

    #[tokio::test]
    async fn test_dispatcher_start_is_idempotent() {
        let dispatcher = offline_dispatcher(ConnectionManager::new_shared());

        assert!(!dispatcher.is_running());
        dispatcher.clone().start();
        dispatcher.clone().start();
        assert!(dispatcher.is_running());

        dispatcher.stop();
        assert!(!dispatcher.is_running());
    }

    #[tokio::test]
    async fn test_listening_follows_local_listeners() {
        let manager = ConnectionManager::new_shared();
        let dispatcher = offline_dispatcher(manager.clone());
        let channel = ChannelName::conversation(ConversationId::new(42));
        let (tx, _rx) = mpsc::channel(8);
        manager.add_connection("a".to_string(), tx);

        assert!(manager.subscribe_to_channel("a", channel));
        assert!(dispatcher.sync_channel(channel).unwrap());
        assert_eq!(dispatcher.listening(), vec![channel]);

        assert!(manager.unsubscribe_from_channel("a", &channel));
        assert!(!dispatcher.sync_channel(channel).unwrap());
        assert!(dispatcher.listening().is_empty());
    }

    #[tokio::test]
    async fn test_late_close_does_not_drop_new_listener() {
        let manager = ConnectionManager::new_shared();
        let dispatcher = offline_dispatcher(manager.clone());
        let channel = ChannelName::conversation(ConversationId::new(42));
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, _rx_b) = mpsc::channel(8);
        manager.add_connection("a".to_string(), tx_a);
        manager.add_connection("b".to_string(), tx_b);

        manager.subscribe_to_channel("a", channel);
        dispatcher.sync_channel(channel).unwrap();

        // A empties the channel, B refills it and syncs before A does
        assert!(manager.unsubscribe_from_channel("a", &channel));
        assert!(manager.subscribe_to_channel("b", channel));
        assert!(dispatcher.sync_channel(channel).unwrap());
        assert!(dispatcher.sync_channel(channel).unwrap());

        assert_eq!(dispatcher.listening(), vec![channel]);
    }
}
