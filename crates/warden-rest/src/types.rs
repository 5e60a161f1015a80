//! Wire types for the REST API

use serde::{Deserialize, Serialize};

/// Response of the gateway discovery endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayInfo {
    /// Websocket URL to dial (version/encoding query added by the caller)
    pub url: String,
}

/// An application (slash) command definition.
///
/// The same shape is used for registration requests and for the registered
/// command the server echoes back (which then carries an `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

/// A nested command option (sub-command or argument)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

/// Option type tags from the command API
pub mod option_kind {
    pub const SUB_COMMAND: u8 = 1;
    pub const INTEGER: u8 = 4;
    pub const USER: u8 = 6;
}

/// A platform user
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// A guild member as returned by the member endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    /// Server-mute flag, the bit the enforcement loop asserts
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub deaf: bool,
}
