//! Gateway wire protocol
//!
//! Frame envelope, op codes, close codes, and handshake payloads for the
//! websocket gateway, seen from the client side.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, Intents, ResumePayload};
