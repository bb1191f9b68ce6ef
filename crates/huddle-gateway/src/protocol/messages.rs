//! Gateway message format
//!
//! Every frame is a JSON text message `{op, t?, s?, c?, d?}`.

use super::{
    ChannelPayload, CloseCode, HelloPayload, IdentifyPayload, OpCode, ReadyPayload,
    TypingSignalPayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event name (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Channel the frame concerns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn bare(op: OpCode) -> Self {
        Self {
            op,
            t: None,
            s: None,
            c: None,
            d: None,
        }
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(
        event: impl Into<String>,
        sequence: u64,
        channel: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event.into()),
            s: Some(sequence),
            c: Some(channel.into()),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
            ..Self::bare(OpCode::Hello)
        }
    }

    /// Create a Ready message (op=8)
    #[must_use]
    pub fn ready(payload: &ReadyPayload) -> Self {
        Self {
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
            ..Self::bare(OpCode::Ready)
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::bare(OpCode::HeartbeatAck)
    }

    /// Create a Subscription Succeeded message (op=12)
    #[must_use]
    pub fn subscription_succeeded(channel: impl Into<String>) -> Self {
        Self {
            c: Some(channel.into()),
            ..Self::bare(OpCode::SubscriptionSucceeded)
        }
    }

    /// Create a Subscription Denied message (op=13)
    ///
    /// Carries no reason; every denial looks the same.
    #[must_use]
    pub fn subscription_denied(channel: impl Into<String>) -> Self {
        Self {
            c: Some(channel.into()),
            ..Self::bare(OpCode::SubscriptionDenied)
        }
    }

    // === Parsing Client Messages ===

    fn payload<T: serde::de::DeserializeOwned>(&self, op: OpCode) -> Option<T> {
        if self.op != op {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        self.payload(OpCode::Identify)
    }

    /// Try to parse as a Subscribe payload (op=3)
    pub fn as_subscribe(&self) -> Option<ChannelPayload> {
        self.payload(OpCode::Subscribe)
    }

    /// Try to parse as an Unsubscribe payload (op=4)
    pub fn as_unsubscribe(&self) -> Option<ChannelPayload> {
        self.payload(OpCode::Unsubscribe)
    }

    /// Try to parse as a Typing payload (op=5)
    pub fn as_typing(&self) -> Option<TypingSignalPayload> {
        self.payload(OpCode::Typing)
    }

    /// Try to parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Code and reason for a close frame
    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.description().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GatewayMessage(op={}", self.op)?;
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        if let Some(c) = &self.c {
            write!(f, ", c={c}")?;
        }
        write!(f, ")")
    }
}
