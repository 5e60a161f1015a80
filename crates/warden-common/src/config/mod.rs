//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BotToken, ConfigError, DatabaseConfig, DiscordConfig, Environment,
    ReconnectSettings, SilenceSettings,
};
