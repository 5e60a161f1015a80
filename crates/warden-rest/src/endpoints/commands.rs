//! Application command endpoints.

use crate::client::RestClient;
use crate::error::{RestError, RestResult};
use crate::types::{option_kind, Command, CommandOption};

/// Build the `silence` command definition: a `user` sub-command taking the
/// target user and a duration in minutes.
#[must_use]
pub fn silence_command() -> Command {
    Command {
        id: None,
        name: "silence".into(),
        description:
            "Use this command to totally silence someone. Specify the amount of time (in minutes), default is 1"
                .into(),
        kind: None,
        options: vec![CommandOption {
            name: "user".into(),
            description:
                "Silence someone, including in voice and text for the specified amount of time (in minutes)"
                    .into(),
            kind: option_kind::SUB_COMMAND,
            required: false,
            options: vec![
                CommandOption {
                    name: "username".into(),
                    description: "User to silence".into(),
                    kind: option_kind::USER,
                    required: true,
                    options: Vec::new(),
                },
                CommandOption {
                    name: "duration".into(),
                    description: "Length of silence (in minutes)".into(),
                    kind: option_kind::INTEGER,
                    required: true,
                    options: Vec::new(),
                },
            ],
        }],
    }
}

impl RestClient {
    /// Register (upsert) an application command. Returns the registered
    /// command with its server-assigned id.
    pub async fn register_command(
        &self,
        app_id: &str,
        command: &Command,
    ) -> RestResult<Command> {
        let body = serde_json::to_value(command)
            .map_err(|e| RestError::Malformed(e.to_string()))?;
        self.post_json(&format!("/applications/{app_id}/commands"), &body)
            .await
    }
}
