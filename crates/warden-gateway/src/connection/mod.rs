//! Connection management
//!
//! Session bookkeeping and the connection manager that owns the socket.

mod manager;
mod session;

pub use manager::{ConnectionState, GatewayClient, GatewayConfig, GatewayError, ReconnectConfig};
pub use session::SessionState;
