use std::time::Duration;

use serde_json::Value;

use super::types::{ConnectionStatus, Message, OnlineUser, ReadReceipt};

/// Notifications the realtime session pushes up to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    StatusChanged(ConnectionStatus),
    ReconnectScheduled {
        attempt: u32,
        delay: Duration,
    },
    /// Full presence set after a snapshot was applied.
    OnlineUsers(Vec<OnlineUser>),
    UserOnline(OnlineUser),
    UserOffline(OnlineUser),
    MessageReceived(Message),
    Notification(Value),
    TypingStarted {
        conversation_id: String,
        user_id: String,
        username: String,
    },
    TypingStopped {
        conversation_id: String,
        user_id: String,
    },
    MessagesRead(ReadReceipt),
    ServerError(Value),
}
