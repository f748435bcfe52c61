//! Socket.IO v5 framing over Engine.IO v4 text frames.
//!
//! Only the pieces the chat client needs are understood: the Engine.IO
//! handshake and keep-alive, and Socket.IO connect/disconnect/event packets on
//! the default namespace. Acks and binary attachments are rejected.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::common::{ClientCommand, Message, MessageType, OnlineUser, ReadReceipt};
use crate::error::{ClientError, ProtocolError};

pub const PONG_FRAME: &str = "3";
pub const DISCONNECT_FRAME: &str = "41";

const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

/// Engine.IO open packet payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL_MS
}

fn default_ping_timeout() -> u64 {
    DEFAULT_PING_TIMEOUT_MS
}

impl Handshake {
    /// Longest silence tolerated before the server is considered gone.
    pub fn keepalive(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedTypingNotice {
    pub user_id: String,
    pub conversation_id: String,
}

/// Server → client events, decoded from `42["name", payload]`.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    OnlineUsers(Vec<OnlineUser>),
    UserOnline(OnlineUser),
    UserOffline(OnlineUser),
    NewMessage(Message),
    MessageNotification(Value),
    UserTyping(TypingNotice),
    UserStoppedTyping(StoppedTypingNotice),
    MessagesRead(ReadReceipt),
    Error(Value),
    Unknown { name: String },
}

impl InboundEvent {
    pub fn from_parts(name: &str, payload: Value) -> Result<Self, ProtocolError> {
        let event = match name {
            "online_users" => InboundEvent::OnlineUsers(typed(name, payload)?),
            "user_online" => InboundEvent::UserOnline(typed(name, payload)?),
            "user_offline" => InboundEvent::UserOffline(typed(name, payload)?),
            "new_message" => InboundEvent::NewMessage(typed(name, payload)?),
            "message_notification" => InboundEvent::MessageNotification(payload),
            "user_typing" => InboundEvent::UserTyping(typed(name, payload)?),
            "user_stopped_typing" => InboundEvent::UserStoppedTyping(typed(name, payload)?),
            "messages_read" => InboundEvent::MessagesRead(typed(name, payload)?),
            "error" => InboundEvent::Error(payload),
            other => InboundEvent::Unknown {
                name: other.to_string(),
            },
        };
        Ok(event)
    }
}

fn typed<T: for<'de> Deserialize<'de>>(event: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|err| ProtocolError::BadPayload {
        event: event.to_string(),
        reason: err.to_string(),
    })
}

/// Client → server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
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
}

impl OutboundEvent {
    /// Maps a caller command to its wire event. `Disconnect` has none.
    pub fn from_command(command: ClientCommand) -> Option<Self> {
        let event = match command {
            ClientCommand::SendMessage {
                receiver_id,
                message,
                message_type,
            } => OutboundEvent::SendMessage {
                receiver_id,
                message,
                message_type,
            },
            ClientCommand::JoinConversation(id) => OutboundEvent::JoinConversation(id),
            ClientCommand::LeaveConversation(id) => OutboundEvent::LeaveConversation(id),
            ClientCommand::MarkMessagesRead(id) => OutboundEvent::MarkMessagesRead(id),
            ClientCommand::TypingStart(id) => OutboundEvent::TypingStart(id),
            ClientCommand::TypingStop(id) => OutboundEvent::TypingStop(id),
            ClientCommand::GetOnlineUsers => OutboundEvent::GetOnlineUsers,
            ClientCommand::Disconnect => return None,
        };
        Some(event)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::SendMessage { .. } => "send_message",
            OutboundEvent::JoinConversation(_) => "join_conversation",
            OutboundEvent::LeaveConversation(_) => "leave_conversation",
            OutboundEvent::MarkMessagesRead(_) => "mark_messages_read",
            OutboundEvent::TypingStart(_) => "typing_start",
            OutboundEvent::TypingStop(_) => "typing_stop",
            OutboundEvent::GetOnlineUsers => "get_online_users",
        }
    }

    fn payload(&self) -> Option<Value> {
        match self {
            OutboundEvent::SendMessage {
                receiver_id,
                message,
                message_type,
            } => Some(json!({
                "receiverId": receiver_id,
                "message": message,
                "messageType": message_type,
            })),
            OutboundEvent::JoinConversation(id)
            | OutboundEvent::LeaveConversation(id)
            | OutboundEvent::MarkMessagesRead(id)
            | OutboundEvent::TypingStart(id)
            | OutboundEvent::TypingStop(id) => Some(json!({ "conversationId": id })),
            OutboundEvent::GetOnlineUsers => None,
        }
    }

    pub fn encode(&self) -> String {
        let mut args = vec![Value::String(self.name().to_string())];
        if let Some(payload) = self.payload() {
            args.push(payload);
        }
        format!("42{}", Value::Array(args))
    }
}

/// Socket.IO CONNECT carrying the bearer token as `auth.token`.
pub fn encode_connect(token: &str) -> String {
    format!("40{}", json!({ "token": token }))
}

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect(Value),
    Disconnect,
    ConnectError(String),
    Event(InboundEvent),
}

pub fn decode(frame: &str) -> Result<Packet, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest),
        '6' => Ok(Packet::Noop),
        other => Err(ProtocolError::UnknownEnginePacket(other)),
    }
}

fn decode_socket(payload: &str) -> Result<Packet, ProtocolError> {
    let mut chars = payload.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = strip_namespace(chars.as_str());

    match kind {
        '0' => {
            if rest.is_empty() {
                Ok(Packet::Connect(Value::Null))
            } else {
                Ok(Packet::Connect(serde_json::from_str(rest)?))
            }
        }
        '1' => Ok(Packet::Disconnect),
        '2' => {
            // ack id, if any, precedes the argument array
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut args: Vec<Value> = serde_json::from_str(rest)?;
            if args.is_empty() {
                return Err(ProtocolError::Malformed("event without a name".into()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(ProtocolError::Malformed(format!(
                        "event name must be a string, got {other}"
                    )));
                }
            };
            let payload = if args.is_empty() {
                Value::Null
            } else {
                args.remove(0)
            };
            Ok(Packet::Event(InboundEvent::from_parts(&name, payload)?))
        }
        '4' => {
            let reason = match serde_json::from_str::<Value>(rest) {
                Ok(Value::Object(map)) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connection refused")
                    .to_string(),
                Ok(Value::String(text)) => text,
                _ => rest.to_string(),
            };
            Ok(Packet::ConnectError(reason))
        }
        '3' | '5' | '6' => Err(ProtocolError::Unsupported(kind)),
        other => Err(ProtocolError::UnknownSocketPacket(other)),
    }
}

fn strip_namespace(payload: &str) -> &str {
    if !payload.starts_with('/') {
        return payload;
    }
    match payload.find(',') {
        Some(index) => &payload[index + 1..],
        None => "",
    }
}

/// Builds the Engine.IO websocket endpoint from a server base url.
pub fn engine_io_url(base: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|err| invalid(err.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch to websocket scheme".into()))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}
