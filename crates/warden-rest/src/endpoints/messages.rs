//! Channel message endpoints.

use crate::client::RestClient;
use crate::error::RestResult;

impl RestClient {
    /// Delete a message from a channel.
    ///
    /// Used to remove messages a silenced user manages to send. Deleting an
    /// already-deleted message returns 404, which callers treat as done.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> RestResult<()> {
        self.delete(&format!("/channels/{channel_id}/messages/{message_id}"))
            .await?;
        Ok(())
    }
}
