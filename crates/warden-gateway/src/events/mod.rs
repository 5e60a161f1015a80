//! Application events
//!
//! Typed dispatch events and the router that reacts to them. Frames are
//! decoded once into [`GatewayEvent`]; everything after that point works on
//! typed payloads, never raw JSON.

mod event_types;
mod payloads;
mod router;

pub use event_types::EventType;
pub use payloads::{
    InteractionData, InteractionEvent, InteractionOption, MessageEvent, ReadyEvent,
    SilenceRequest, UserRef,
};
pub use router::{EventRouter, MessageApi};

use serde_json::Value;

/// A decoded application event
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    Resumed,
    GuildCreate,
    MessageCreate(MessageEvent),
    InteractionCreate(InteractionEvent),
    /// An event name this client has no handler for
    Unknown(String),
}

impl GatewayEvent {
    /// Decode a dispatch payload by event name.
    ///
    /// Unknown names succeed as [`GatewayEvent::Unknown`]; a known name with
    /// a payload of the wrong shape is an error the dispatcher logs and
    /// drops.
    pub fn parse(name: &str, payload: Option<&Value>) -> Result<Self, serde_json::Error> {
        let payload = payload.cloned().unwrap_or(Value::Null);
        match EventType::from_str(name) {
            Some(EventType::Ready) => Ok(Self::Ready(serde_json::from_value(payload)?)),
            Some(EventType::Resumed) => Ok(Self::Resumed),
            Some(EventType::GuildCreate) => Ok(Self::GuildCreate),
            Some(EventType::MessageCreate) => {
                Ok(Self::MessageCreate(serde_json::from_value(payload)?))
            }
            Some(EventType::InteractionCreate) => {
                Ok(Self::InteractionCreate(serde_json::from_value(payload)?))
            }
            None => Ok(Self::Unknown(name.to_string())),
        }
    }
}
