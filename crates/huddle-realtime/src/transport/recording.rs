//! In-process transport that records every delivered frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use huddle_cache::PubSubEvent;
use huddle_core::{ChannelName, EventName};
use parking_lot::Mutex;

use super::{Transport, TransportError, TransportResult};

/// One frame as it was handed to the transport, per channel
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub channel: ChannelName,
    pub event: PubSubEvent,
}

impl RecordedFrame {
    /// Whether this frame carries the given event
    #[must_use]
    pub fn is(&self, event: EventName) -> bool {
        self.event.event == event.as_str()
    }
}

/// Transport that keeps frames in memory instead of sending them.
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    frames: Arc<Mutex<Vec<RecordedFrame>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail as if the backend were down
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all recorded frames, oldest first
    #[must_use]
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.frames.lock().clone()
    }

    /// Frames published on one channel
    #[must_use]
    pub fn frames_on(&self, channel: &ChannelName) -> Vec<RecordedFrame> {
        self.frames
            .lock()
            .iter()
            .filter(|f| &f.channel == channel)
            .cloned()
            .collect()
    }

    /// Number of frames carrying the given event
    #[must_use]
    pub fn count(&self, event: EventName) -> usize {
        self.frames.lock().iter().filter(|f| f.is(event)).count()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, channels: &[ChannelName], event: &PubSubEvent) -> TransportResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("recording transport set to fail".to_string()));
        }

        let mut frames = self.frames.lock();
        for channel in channels {
            frames.push(RecordedFrame {
                channel: *channel,
                event: event.clone(),
            });
        }
        Ok(())
    }
}
