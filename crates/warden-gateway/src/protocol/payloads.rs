//! Handshake payload definitions
//!
//! Payload structures for the frames exchanged while a session is being
//! established. Dispatch event payloads live in `crate::events`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Event-group subscription bitmask sent at identify.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Intents: u32 {
        const GUILDS = 1 << 0;
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_MESSAGES = 1 << 9;
        const MESSAGE_CONTENT = 1 << 15;
    }
}

impl Intents {
    /// Everything a moderation bot needs: guilds, members, messages, content.
    #[must_use]
    pub fn moderation() -> Self {
        Self::GUILDS | Self::GUILD_MEMBERS | Self::GUILD_MESSAGES | Self::MESSAGE_CONTENT
    }
}

/// Payload of op 10 (Hello), the first frame on any connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload of op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Bot token
    pub token: String,
    /// Client metadata
    pub properties: IdentifyProperties,
    /// Raw intents bitmask
    pub intents: u32,
}

impl IdentifyPayload {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::default(),
            intents: intents.bits(),
        }
    }
}

/// Client connection properties sent at identify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "warden".to_string(),
            device: "warden".to_string(),
        }
    }
}

/// Payload of op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Bot token
    pub token: String,
    /// Session to reattach to
    pub session_id: String,
    /// Last sequence number processed before the drop
    pub seq: u64,
}
