use super::types::MessageType;

/// Requests the caller hands to the realtime session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    SendMessage {
        receiver_id: String,
        message: String,
        message_type: MessageType,
    },
    JoinConversation(String),
    LeaveConversation(String),
    MarkMessagesRead(String),
    TypingStart(String),
    TypingStop(String),
    GetOnlineUsers,
    /// Client-initiated disconnect. Never followed by a reconnect.
    Disconnect,
}
