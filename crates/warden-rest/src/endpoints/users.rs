//! User endpoints.

use crate::client::RestClient;
use crate::error::RestResult;
use crate::types::User;

impl RestClient {
    /// Fetch a user by id.
    pub async fn get_user(&self, user_id: &str) -> RestResult<User> {
        self.get_json(&format!("/users/{user_id}")).await
    }
}
