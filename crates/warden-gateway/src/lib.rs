//! # warden-gateway
//!
//! Client side of the platform's websocket gateway: connection management
//! with resume and backoff, opcode dispatch, heartbeating, event routing,
//! and the timed silence enforcement loops the events trigger.

pub mod connection;
pub mod dispatch;
pub mod enforce;
pub mod events;
pub mod heartbeat;
pub mod protocol;
pub mod transport;

// Re-export the types callers wire together
pub use connection::{
    ConnectionState, GatewayClient, GatewayConfig, GatewayError, ReconnectConfig, SessionState,
};
pub use enforce::{EnforcementRegistry, MuteApi};
pub use events::EventRouter;
