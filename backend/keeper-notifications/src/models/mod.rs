use serde::{Deserialize, Serialize};

/// Notification event as published on `keeper.exchange`.
///
/// Created per inbound message and dropped after dispatch. Fields missing
/// from the body decode to their empty value; wrong types are an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPayload {
    /// Target user. Never log this; use `recipient_hash` instead.
    #[serde(rename = "recipientUsername")]
    pub recipient_identifier: String,
    #[serde(rename = "senderUsername")]
    pub sender_identifier: String,
    #[serde(rename = "messageContent")]
    pub message_content: String,
    #[serde(rename = "roomId")]
    pub conversation_id: i64,
    #[serde(rename = "fcmToken")]
    pub delivery_token: Option<String>,
}

impl NotificationPayload {
    /// Decode a raw message body
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Device token, if one is present and non-empty
    pub fn delivery_token(&self) -> Option<&str> {
        self.delivery_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Push title shown on the device
    pub fn title(&self) -> String {
        format!("new message from {}", self.sender_identifier)
    }
}

/// Lifecycle of the broker subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
    Stopped,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Subscribed => write!(f, "subscribed"),
            ConnectionState::Stopped => write!(f, "stopped"),
        }
    }
}
