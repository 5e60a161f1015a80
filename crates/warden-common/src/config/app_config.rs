//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present).

use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub discord: DiscordConfig,
    pub database: DatabaseConfig,
    pub reconnect: ReconnectSettings,
    pub silence: SilenceSettings,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Bot credential token.
///
/// Wrapped so that `Debug`/`Display` never reveal the token itself; the raw
/// value is only reachable through [`BotToken::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken(String);

impl BotToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Access the raw token for request signing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(***)")
    }
}

impl fmt::Display for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Remote platform credentials and endpoints
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot bearer token, sent as `Authorization: Bot <token>`.
    pub token: BotToken,
    /// Application id used for command registration.
    pub app_id: String,
    /// REST API base, e.g. `https://discord.com/api/v10`.
    pub api_base: String,
    /// Gateway protocol version appended to the websocket URL.
    pub gateway_version: u8,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Gateway reconnect policy settings
#[derive(Debug, Clone)]
pub struct ReconnectSettings {
    /// First retry delay; doubles each attempt.
    pub base_delay: Duration,
    /// Upper bound on a single retry delay.
    pub max_delay: Duration,
    /// Attempts before the session is cleared and the counter restarts.
    pub max_attempts: u32,
}

/// Silence enforcement settings
#[derive(Debug, Clone)]
pub struct SilenceSettings {
    /// How often an enforcement loop re-checks the mute flag.
    pub poll_interval: Duration,
}

// Default value functions
fn default_app_name() -> String {
    "warden".to_string()
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_database_url() -> String {
    "sqlite://warden.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_gateway_version() -> u8 {
    10
}

fn default_reconnect_base_secs() -> u64 {
    1
}

fn default_reconnect_max_secs() -> u64 {
    30
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_silence_poll_secs() -> u64 {
    3
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            discord: DiscordConfig {
                token: env::var("BOT_TOKEN")
                    .map(BotToken::new)
                    .map_err(|_| ConfigError::MissingVar("BOT_TOKEN"))?,
                app_id: env::var("APP_ID").map_err(|_| ConfigError::MissingVar("APP_ID"))?,
                api_base: env::var("API_BASE").unwrap_or_else(|_| default_api_base()),
                gateway_version: env::var("GATEWAY_VERSION")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_gateway_version),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_connections),
            },
            reconnect: ReconnectSettings {
                base_delay: Duration::from_secs(
                    env::var("RECONNECT_BASE_DELAY_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(default_reconnect_base_secs),
                ),
                max_delay: Duration::from_secs(
                    env::var("RECONNECT_MAX_DELAY_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(default_reconnect_max_secs),
                ),
                max_attempts: env::var("RECONNECT_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_reconnect_attempts),
            },
            silence: SilenceSettings {
                poll_interval: Duration::from_secs(
                    env::var("SILENCE_POLL_INTERVAL_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(default_silence_poll_secs),
                ),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_token_never_prints() {
        let token = BotToken::new("very-secret-token");
        assert_eq!(format!("{token:?}"), "BotToken(***)");
        assert_eq!(format!("{token}"), "***");
        assert_eq!(token.expose(), "very-secret-token");
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = DiscordConfig {
            token: BotToken::new("very-secret-token"),
            app_id: "123".into(),
            api_base: default_api_base(),
            gateway_version: 10,
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("very-secret-token"));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_app_name(), "warden");
        assert_eq!(default_gateway_version(), 10);
        assert_eq!(default_reconnect_base_secs(), 1);
        assert_eq!(default_reconnect_max_secs(), 30);
        assert_eq!(default_reconnect_attempts(), 5);
        assert_eq!(default_silence_poll_secs(), 3);
    }
}
