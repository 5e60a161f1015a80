//! Guild member endpoints.
//!
//! The server-mute flag lives on the guild member object; the enforcement
//! loop in `warden-gateway` reads and re-asserts it through these calls.
//! Both are idempotent: a GET is pure and PATCHing `mute` to its current
//! value is a no-op on the server.

use serde_json::json;

use crate::client::RestClient;
use crate::error::RestResult;
use crate::types::GuildMember;

impl RestClient {
    /// Fetch a guild member.
    pub async fn get_member(&self, guild_id: &str, user_id: &str) -> RestResult<GuildMember> {
        self.get_json(&format!("/guilds/{guild_id}/members/{user_id}"))
            .await
    }

    /// Read the member's server-mute flag.
    pub async fn get_mute(&self, guild_id: &str, user_id: &str) -> RestResult<bool> {
        Ok(self.get_member(guild_id, user_id).await?.mute)
    }

    /// Set the member's server-mute flag.
    pub async fn set_mute(&self, guild_id: &str, user_id: &str, muted: bool) -> RestResult<()> {
        self.patch(
            &format!("/guilds/{guild_id}/members/{user_id}"),
            &json!({ "mute": muted }),
        )
        .await?;
        Ok(())
    }
}
