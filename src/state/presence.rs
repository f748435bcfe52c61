use crate::common::OnlineUser;

/// Set of peers currently online, keyed by `user_id`.
///
/// Kept in arrival order; an upsert moves the user to the end.
#[derive(Debug, Default, Clone)]
pub struct PresenceTracker {
    users: Vec<OnlineUser>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole set. Later duplicates in the snapshot win.
    pub fn replace_all(&mut self, snapshot: Vec<OnlineUser>) {
        self.users.clear();
        for user in snapshot {
            self.upsert(user);
        }
    }

    pub fn upsert(&mut self, user: OnlineUser) {
        self.users.retain(|existing| existing.user_id != user.user_id);
        self.users.push(user);
    }

    pub fn remove(&mut self, user_id: &str) -> Option<OnlineUser> {
        let index = self.users.iter().position(|user| user.user_id == user_id)?;
        Some(self.users.remove(index))
    }

    pub fn users(&self) -> &[OnlineUser] {
        &self.users
    }
}
