use collabforge_realtime::api::Conversation;
use collabforge_realtime::format::{format_chat_time, generate_notification_text};
use collabforge_realtime::{ClientEvent, ConnectionStatus, Message, MessageType, OnlineUser};

pub fn message_line(message: &Message) -> String {
    match message.message_type {
        MessageType::Text => message.body.clone(),
        other => format!("[{other}] {}", message.body),
    }
}

fn display_name(user: &OnlineUser) -> &str {
    if user.name.is_empty() {
        &user.username
    } else {
        &user.name
    }
}

pub fn online_list(users: &[OnlineUser]) -> String {
    if users.is_empty() {
        return "Nobody else is online".to_string();
    }
    let names: Vec<&str> = users.iter().map(display_name).collect();
    format!("Online ({}): {}", users.len(), names.join(", "))
}

pub fn conversation_line(conversation: &Conversation) -> String {
    let names: Vec<&str> = conversation
        .participants
        .iter()
        .map(|participant| {
            if participant.name.is_empty() {
                participant.username.as_str()
            } else {
                participant.name.as_str()
            }
        })
        .collect();
    let mut line = format!("{}  {}", conversation.conversation_id, names.join(", "));
    if conversation.unread_count > 0 {
        line.push_str(&format!(" ({} unread)", conversation.unread_count));
    }
    if let Some(last) = &conversation.last_message {
        line.push_str(&format!(
            "\n    {}",
            generate_notification_text(last.sender_name(), &last.body, last.message_type)
        ));
    }
    line
}

/// One line of terminal output per event; `None` for events not worth showing.
pub fn event_line(event: &ClientEvent) -> Option<String> {
    let line = match event {
        ClientEvent::StatusChanged(ConnectionStatus::GaveUp) => {
            "Connection lost for good; restart the client to retry".to_string()
        }
        ClientEvent::StatusChanged(status) => format!("* {status}"),
        ClientEvent::ReconnectScheduled { attempt, delay } => {
            format!("* reconnecting in {}s (attempt {attempt})", delay.as_secs())
        }
        ClientEvent::OnlineUsers(users) => online_list(users),
        ClientEvent::UserOnline(user) => format!("{} is online", display_name(user)),
        ClientEvent::UserOffline(user) => format!("{} went offline", display_name(user)),
        ClientEvent::MessageReceived(message) => format!(
            "[{}] {}",
            format_chat_time(message.created_at),
            generate_notification_text(message.sender_name(), &message.body, message.message_type)
        ),
        ClientEvent::TypingStarted { username, .. } => format!("{username} is typing..."),
        ClientEvent::MessagesRead(receipt) => {
            format!("{} read conversation {}", receipt.read_by, receipt.conversation_id)
        }
        ClientEvent::ServerError(payload) => format!("! server error: {payload}"),
        ClientEvent::Notification(_) | ClientEvent::TypingStopped { .. } => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_line_names_participants_and_unread() {
        let conversation: Conversation = serde_json::from_str(
            r#"{"_id":"c1","participants":[{"userId":"u1","name":"Ada","username":"ada"},{"userId":"u2","name":"","username":"bo"}],"unreadCount":2}"#,
        )
        .unwrap();
        assert_eq!(conversation_line(&conversation), "c1  Ada, bo (2 unread)");
    }
}
