//! # warden-rest
//!
//! Stateless HTTP client for the platform's REST API: gateway URL discovery,
//! slash-command registration, guild-member mute mutation, and message
//! deletion. Every call is a one-shot authenticated request/response; the
//! long-lived gateway socket lives in `warden-gateway`.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod types;

// Re-export key types
pub use client::{RestClient, RetryConfig};
pub use error::{RestError, RestResult};
pub use types::{Command, CommandOption, GatewayInfo, GuildMember, User};
