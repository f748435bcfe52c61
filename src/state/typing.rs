use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Remote users currently typing, per conversation.
///
/// Entries vanish on an explicit stop or once `timeout` passes without a
/// refresh.
#[derive(Debug)]
pub struct TypingTracker {
    timeout: Duration,
    // conversation id -> user id -> expiry
    conversations: HashMap<String, HashMap<String, Instant>>,
}

impl TypingTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            conversations: HashMap::new(),
        }
    }

    /// Returns `true` if the user was not already marked as typing.
    pub fn start(&mut self, conversation_id: &str, user_id: &str) -> bool {
        let expires_at = Instant::now() + self.timeout;
        self.conversations
            .entry(conversation_id.to_string())
            .or_default()
            .insert(user_id.to_string(), expires_at)
            .is_none()
    }

    /// Returns `true` if the user was marked as typing.
    pub fn stop(&mut self, conversation_id: &str, user_id: &str) -> bool {
        let Some(users) = self.conversations.get_mut(conversation_id) else {
            return false;
        };
        let removed = users.remove(user_id).is_some();
        if users.is_empty() {
            self.conversations.remove(conversation_id);
        }
        removed
    }

    /// Drops expired entries, returning `(conversation_id, user_id)` pairs.
    pub fn expire(&mut self, now: Instant) -> Vec<(String, String)> {
        let mut expired = Vec::new();
        self.conversations.retain(|conversation_id, users| {
            users.retain(|user_id, expires_at| {
                let alive = *expires_at > now;
                if !alive {
                    expired.push((conversation_id.clone(), user_id.clone()));
                }
                alive
            });
            !users.is_empty()
        });
        expired
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn start_and_stop() {
        let mut typing = TypingTracker::new(Duration::from_secs(5));
        assert!(typing.start("c1", "u1"));
        assert!(!typing.start("c1", "u1"));
        assert!(typing.start("c2", "u1"));

        assert!(typing.stop("c1", "u1"));
        assert!(!typing.stop("c1", "u1"));
        assert!(typing.start("c1", "u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_timeout() {
        let mut typing = TypingTracker::new(Duration::from_secs(5));
        typing.start("c1", "u1");
        tokio::time::advance(Duration::from_secs(3)).await;
        typing.start("c1", "u2");

        assert!(typing.expire(Instant::now()).is_empty());

        tokio::time::advance(Duration::from_secs(2)).await;
        let expired = typing.expire(Instant::now());
        assert_eq!(expired, vec![("c1".to_string(), "u1".to_string())]);
        assert!(typing.stop("c1", "u2"));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_extends_expiry() {
        let mut typing = TypingTracker::new(Duration::from_secs(5));
        typing.start("c1", "u1");
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!typing.start("c1", "u1"));
        tokio::time::advance(Duration::from_secs(4)).await;

        assert!(typing.expire(Instant::now()).is_empty());
    }
}
