use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of payload carried by a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    Audio,
    Video,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::Audio => "audio",
            MessageType::Video => "video",
        };
        f.write_str(name)
    }
}

/// A peer reported online by the chat server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "lastSeenTimestamp")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Sender details embedded in a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
}

/// Chat message as produced by the server. Never mutated client side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub chat_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(rename = "message", alias = "body")]
    pub body: String,
    #[serde(default, alias = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default)]
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sender: Option<MessageSender>,
}

impl Message {
    /// Display name of the sender, falling back to the raw id.
    pub fn sender_name(&self) -> &str {
        match &self.sender {
            Some(sender) if !sender.name.is_empty() => &sender.name,
            Some(sender) if !sender.username.is_empty() => &sender.username,
            _ => &self.sender_id,
        }
    }
}

/// Read receipt pushed when the other side marks a conversation read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub conversation_id: String,
    pub read_by: String,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

/// Lifecycle of the realtime session.
///
/// `GaveUp` is terminal: the reconnect budget is spent and nothing else
/// will be attempted until a new session is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
    GaveUp,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::GaveUp => "gave up",
        };
        f.write_str(name)
    }
}
