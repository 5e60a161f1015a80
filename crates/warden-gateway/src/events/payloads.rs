//! Dispatch event payloads

use serde::Deserialize;
use serde_json::Value;

/// A user reference as embedded in event payloads
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// Payload of the READY dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    pub session_id: String,
    pub resume_gateway_url: String,
    /// The bot's own user, when the server includes it
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// Payload of a MESSAGE_CREATE dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: UserRef,
}

/// Payload of an INTERACTION_CREATE dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionEvent {
    pub data: InteractionData,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Invoked command data inside an interaction
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

/// A command option value (possibly a sub-command with nested options)
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

/// A parsed `/silence user` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceRequest {
    pub user_id: String,
    pub minutes: i64,
    pub guild_id: String,
}

impl InteractionEvent {
    /// Extract a silence request, if this interaction is one.
    ///
    /// The command is registered as `/silence user <username> <duration>`,
    /// so the payload nests the arguments one sub-command deep. Options are
    /// matched by name; durations under a minute are rounded up to one.
    #[must_use]
    pub fn silence_request(&self) -> Option<SilenceRequest> {
        if self.data.name != "silence" {
            return None;
        }
        let guild_id = self.guild_id.clone()?;
        let sub = self.data.options.first()?;

        let user_id = sub
            .options
            .iter()
            .find(|o| o.name == "username")?
            .value
            .as_ref()?
            .as_str()?
            .to_string();

        let minutes = sub
            .options
            .iter()
            .find(|o| o.name == "duration")?
            .value
            .as_ref()
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))?;

        Some(SilenceRequest {
            user_id,
            minutes: minutes.max(1),
            guild_id,
        })
    }
}
