//! Gateway discovery endpoint.

use crate::client::RestClient;
use crate::error::{RestError, RestResult};
use crate::types::GatewayInfo;

impl RestClient {
    /// Fetch the websocket URL to dial.
    ///
    /// Called once at startup; reconnects prefer the session's resume URL and
    /// only fall back to this one.
    pub async fn get_gateway_url(&self) -> RestResult<String> {
        let info: GatewayInfo = self.get_json("/gateway").await?;
        if info.url.is_empty() {
            return Err(RestError::Malformed("empty gateway url".into()));
        }
        Ok(info.url)
    }
}
