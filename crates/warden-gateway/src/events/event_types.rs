//! Dispatch event names
//!
//! Event names this client reacts to, carried in the `t` field of dispatch
//! frames. Everything else passes through as unknown and is logged once at
//! debug level.

use std::fmt;

/// Known dispatch event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Sent once after a successful identify; carries the session identity
    Ready,
    /// Sent after a successful resume
    Resumed,
    /// Guild available or joined
    GuildCreate,
    /// New message in a subscribed channel
    MessageCreate,
    /// A slash command was invoked
    InteractionCreate,
}

impl EventType {
    /// Get the wire name of this event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::InteractionCreate => "INTERACTION_CREATE",
        }
    }

    /// Parse an event type from its wire name
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(Self::Ready),
            "RESUMED" => Some(Self::Resumed),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "INTERACTION_CREATE" => Some(Self::InteractionCreate),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
