//! Pure helpers that turn chat data into display text.

use chrono::{DateTime, TimeDelta, Utc};

use crate::common::{Message, MessageType};

pub const DEFAULT_TRUNCATE_LEN: usize = 50;
pub const NOTIFICATION_PREVIEW_LEN: usize = 30;
pub const DEFAULT_GROUP_GAP_MINUTES: i64 = 5;

/// Relative timestamp for chat lists, measured against the current time.
pub fn format_chat_time(timestamp: DateTime<Utc>) -> String {
    format_chat_time_at(timestamp, Utc::now())
}

/// Buckets `now - timestamp`, flooring at every unit. Timestamps in the
/// future read as "Just now".
pub fn format_chat_time_at(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);

    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }

    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }

    match elapsed.num_days() {
        1 => "Yesterday".to_string(),
        days if days < 7 => format!("{days} days ago"),
        _ => timestamp.format("%-m/%-d/%Y").to_string(),
    }
}

/// Cuts `text` to `max_len` characters and appends "..." when it was longer.
pub fn truncate_message(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn generate_notification_text(
    sender_name: &str,
    message: &str,
    message_type: MessageType,
) -> String {
    match message_type {
        MessageType::Image => format!("{sender_name} sent a photo"),
        MessageType::File => format!("{sender_name} sent a file"),
        MessageType::Audio => format!("{sender_name} sent an audio message"),
        MessageType::Video => format!("{sender_name} sent a video"),
        MessageType::Text => format!(
            "{sender_name}: {}",
            truncate_message(message, NOTIFICATION_PREVIEW_LEN)
        ),
    }
}

/// Consecutive messages from one sender, rendered as a single bubble run.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup<'a> {
    pub sender_id: &'a str,
    pub messages: Vec<&'a Message>,
}

/// Splits an ascending list into runs sharing a sender with no gap above
/// `max_gap_minutes`. Unsorted input is not detected.
pub fn group_messages(messages: &[Message], max_gap_minutes: i64) -> Vec<MessageGroup<'_>> {
    let max_gap = TimeDelta::try_minutes(max_gap_minutes).unwrap_or(TimeDelta::MAX);
    let mut groups: Vec<MessageGroup<'_>> = Vec::new();

    for message in messages {
        let joins_last = groups.last().is_some_and(|group| {
            group.sender_id == message.sender_id
                && group
                    .messages
                    .last()
                    .is_some_and(|previous| message.created_at - previous.created_at <= max_gap)
        });

        match groups.last_mut() {
            Some(group) if joins_last => group.messages.push(message),
            _ => groups.push(MessageGroup {
                sender_id: &message.sender_id,
                messages: vec![message],
            }),
        }
    }

    groups
}

/// Human readable byte count: "512 Bytes", "1.5 KB", "10 MB".
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn ago(delta: TimeDelta) -> String {
        format_chat_time_at(now() - delta, now())
    }

    #[test]
    fn chat_time_buckets() {
        assert_eq!(ago(TimeDelta::seconds(59)), "Just now");
        assert_eq!(ago(TimeDelta::seconds(-30)), "Just now");
        assert_eq!(ago(TimeDelta::minutes(1)), "1m ago");
        assert_eq!(ago(TimeDelta::minutes(59)), "59m ago");
        assert_eq!(ago(TimeDelta::minutes(60)), "1h ago");
        assert_eq!(ago(TimeDelta::hours(23) + TimeDelta::minutes(59)), "23h ago");
        assert_eq!(ago(TimeDelta::hours(24)), "Yesterday");
        assert_eq!(ago(TimeDelta::hours(47)), "Yesterday");
        assert_eq!(ago(TimeDelta::hours(48)), "2 days ago");
        assert_eq!(ago(TimeDelta::days(6)), "6 days ago");
        assert_eq!(ago(TimeDelta::days(7)), "5/13/2024");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_message("hello", 5), "hello");
        assert_eq!(truncate_message("hello!", 5), "hello...");
        assert_eq!(truncate_message("", 5), "");
    }

    #[test]
    fn truncate_is_idempotent_within_limit() {
        for text in ["", "short", "exactly ten"] {
            let once = truncate_message(text, 11);
            assert_eq!(truncate_message(&once, 11), once);
        }
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_message("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_message("日本語", 3), "日本語");
    }

    #[test]
    fn notification_text_per_type() {
        assert_eq!(
            generate_notification_text("Ada", "", MessageType::Image),
            "Ada sent a photo"
        );
        assert_eq!(
            generate_notification_text("Ada", "", MessageType::File),
            "Ada sent a file"
        );
        assert_eq!(
            generate_notification_text("Ada", "", MessageType::Audio),
            "Ada sent an audio message"
        );
        assert_eq!(
            generate_notification_text("Ada", "", MessageType::Video),
            "Ada sent a video"
        );
        assert_eq!(
            generate_notification_text("Ada", "Can we move the shoot to Friday afternoon?", MessageType::Text),
            "Ada: Can we move the shoot to Frida...",
        );
    }

    fn message(sender: &str, at: DateTime<Utc>) -> Message {
        Message {
            chat_id: format!("{sender}-{}", at.timestamp()),
            conversation_id: "c1".into(),
            sender_id: sender.into(),
            receiver_id: String::new(),
            body: "hi".into(),
            message_type: MessageType::Text,
            is_read: false,
            is_delivered: true,
            is_edited: false,
            created_at: at,
            updated_at: None,
            sender: None,
        }
    }

    #[test]
    fn groups_split_on_sender_change() {
        let t0 = now();
        let messages = vec![
            message("A", t0),
            message("A", t0 + TimeDelta::seconds(60)),
            message("B", t0 + TimeDelta::seconds(61)),
        ];

        let groups = group_messages(&messages, DEFAULT_GROUP_GAP_MINUTES);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].sender_id, "A");
        assert_eq!(groups[0].messages.len(), 2);
        assert_eq!(groups[1].sender_id, "B");
        assert_eq!(groups[1].messages.len(), 1);
    }

    #[test]
    fn groups_split_on_long_gap() {
        let t0 = now();
        let messages = vec![
            message("A", t0),
            message("A", t0 + TimeDelta::minutes(5)),
            message("A", t0 + TimeDelta::minutes(10) + TimeDelta::seconds(1)),
        ];

        let groups = group_messages(&messages, 5);
        let sizes: Vec<usize> = groups.iter().map(|group| group.messages.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
        assert!(group_messages(&[], 5).is_empty());
    }

    #[test]
    fn huge_gap_threshold_keeps_one_run() {
        let t0 = now();
        let messages = vec![message("A", t0), message("A", t0 + TimeDelta::days(400))];

        let groups = group_messages(&messages, i64::MAX);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].messages.len(), 2);
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }
}
