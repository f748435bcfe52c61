pub mod presence;
pub mod typing;

pub use presence::PresenceTracker;
pub use typing::TypingTracker;
