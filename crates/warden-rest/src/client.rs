//! HTTP client for the platform REST API.
//!
//! Wraps `reqwest::Client` with bot authentication, request timeouts, and
//! exponential backoff retry for transient failures. All mutating endpoints
//! this bot uses (member PATCH, message DELETE) are idempotent, so retrying
//! them is safe.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use warden_common::config::DiscordConfig;

use crate::error::{RestError, RestResult};

/// Retry configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        }
    }
}

/// Authenticated HTTP client for the platform REST API.
#[derive(Clone)]
pub struct RestClient {
    inner: Client,
    /// API base, e.g. `https://discord.com/api/v10`.
    base_url: String,
    /// `Authorization` header value (`Bot <token>`).
    auth_header: String,
    retry_config: RetryConfig,
}

impl RestClient {
    /// Create a new RestClient from platform configuration.
    pub fn new(config: &DiscordConfig) -> RestResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| RestError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            auth_header: format!("Bot {}", config.token.expose()),
            retry_config: RetryConfig::default(),
        })
    }

    /// Set custom retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with auth and content headers applied.
    fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self
            .inner
            .request(method, url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json");
        if let Some(b) = body {
            builder = builder.json(b);
        }
        builder
    }

    /// Execute a request with exponential backoff retry.
    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> RestResult<Response> {
        debug!("{} {}", method, path);

        let mut last_error: Option<RestError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {:.1}s",
                    method,
                    path,
                    attempt + 1,
                    self.retry_config.max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let builder = self.build_request(method.clone(), path, body);

            match builder.send().await {
                Ok(response) => match Self::check_status(response).await {
                    Ok(response) => return Ok(response),
                    Err(err) if err.is_retryable() && attempt < self.retry_config.max_retries => {
                        warn!("retryable status on {}: {}", path, err);
                        last_error = Some(err);
                    }
                    Err(err) => return Err(err),
                },
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
                    let err = Self::classify_error(e);

                    if is_retryable && attempt < self.retry_config.max_retries {
                        warn!("retryable error on {}: {}", path, err);
                        last_error = Some(err);
                    } else {
                        return Err(err);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RestError::Http("max retries exceeded".into())))
    }

    /// Retry delay for the given zero-based attempt: base doubled per
    /// attempt, capped.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(16));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    // --- HTTP methods used by the endpoint modules ---

    pub(crate) async fn get(&self, path: &str) -> RestResult<Response> {
        self.request_with_retry(Method::GET, path, None).await
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> RestResult<Response> {
        self.request_with_retry(Method::POST, path, Some(body)).await
    }

    pub(crate) async fn patch(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> RestResult<Response> {
        self.request_with_retry(Method::PATCH, path, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> RestResult<Response> {
        self.request_with_retry(Method::DELETE, path, None).await
    }

    /// Convenience: GET + deserialize the body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RestResult<T> {
        let response = self.get(path).await?;
        Self::parse_body(response).await
    }

    /// Convenience: POST + deserialize the body.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> RestResult<T> {
        let response = self.post(path, body).await?;
        Self::parse_body(response).await
    }

    async fn parse_body<T: DeserializeOwned>(response: Response) -> RestResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| RestError::Malformed(e.to_string()))
    }

    /// Map non-success statuses into typed errors.
    async fn check_status(response: Response) -> RestResult<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RestError::AuthFailed(status.as_u16()));
        }

        if status.is_client_error() || status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(RestError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Classify a reqwest error into a RestError variant.
    fn classify_error(e: reqwest::Error) -> RestError {
        if e.is_timeout() {
            RestError::Timeout(e.to_string())
        } else if e.is_connect() {
            RestError::Http(format!("connection failed: {e}"))
        } else {
            RestError::Http(e.to_string())
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // auth_header carries the token; keep it out of logs
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
