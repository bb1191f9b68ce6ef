//! Gateway operation codes

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway operation codes
///
/// Op codes define the type of frame sent or received over the WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Server delivers a broadcast event (server only)
    Dispatch = 0,
    /// Keep the connection and the user's presence alive (client only)
    Heartbeat = 1,
    /// Authenticate the session and pick a workspace (client only)
    Identify = 2,
    /// Ask to join a channel (client only)
    Subscribe = 3,
    /// Leave a channel (client only)
    Unsubscribe = 4,
    /// Typing started or stopped in a conversation (client only)
    Typing = 5,
    /// Identify succeeded (server only)
    Ready = 8,
    /// Sent on connect (server only)
    Hello = 10,
    /// Heartbeat acknowledged (server only)
    HeartbeatAck = 11,
    /// Subscription granted (server only)
    SubscriptionSucceeded = 12,
    /// Subscription refused (server only)
    SubscriptionDenied = 13,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::Subscribe),
            4 => Some(Self::Unsubscribe),
            5 => Some(Self::Typing),
            8 => Some(Self::Ready),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            12 => Some(Self::SubscriptionSucceeded),
            13 => Some(Self::SubscriptionDenied),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this op code can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(
            self,
            Self::Heartbeat | Self::Identify | Self::Subscribe | Self::Unsubscribe | Self::Typing
        )
    }

    /// Check if this op code can be sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        !self.is_client_op()
    }

    /// Check if this op code is accepted before Identify
    #[must_use]
    pub const fn allowed_before_identify(self) -> bool {
        matches!(self, Self::Heartbeat | Self::Identify)
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::Subscribe => "Subscribe",
            Self::Unsubscribe => "Unsubscribe",
            Self::Typing => "Typing",
            Self::Ready => "Ready",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
            Self::SubscriptionSucceeded => "SubscriptionSucceeded",
            Self::SubscriptionDenied => "SubscriptionDenied",
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid op code: {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
