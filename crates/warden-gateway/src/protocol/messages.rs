//! Gateway frame envelope
//!
//! Every frame on the socket is one JSON object: `op` always present, `d`
//! carrying the opcode-specific payload, `s`/`t` populated only on dispatch
//! frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{HelloPayload, IdentifyPayload, OpCode, ResumePayload};

/// Gateway frame envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event data payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,

    /// Sequence number (only on op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name (only on op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    // === Frames this client sends ===

    /// Build a heartbeat frame (op=1) carrying the last processed sequence.
    #[must_use]
    pub fn heartbeat(sequence: u64) -> Self {
        Self {
            op: OpCode::Heartbeat,
            d: Some(Value::Number(sequence.into())),
            s: None,
            t: None,
        }
    }

    /// Build an identify frame (op=2).
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self {
            op: OpCode::Identify,
            d: serde_json::to_value(payload).ok(),
            s: None,
            t: None,
        }
    }

    /// Build a resume frame (op=6).
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self {
            op: OpCode::Resume,
            d: serde_json::to_value(payload).ok(),
            s: None,
            t: None,
        }
    }

    // === Parsing frames the server sends ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// For op=9 (Invalid Session): whether the server says the session is
    /// still resumable. `None` for any other opcode.
    pub fn invalid_session_resumable(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(
            self.d
                .as_ref()
                .and_then(Value::as_bool)
                .unwrap_or(false),
        )
    }

    /// Whether this frame is an application event
    #[must_use]
    pub fn is_dispatch(&self) -> bool {
        self.op == OpCode::Dispatch
    }

    /// Event name of a dispatch frame
    pub fn event_name(&self) -> Option<&str> {
        self.t.as_deref()
    }

    /// Whether the envelope honours the dispatch invariant: `s` and `t`
    /// present if and only if `op` is Dispatch.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if self.is_dispatch() {
            self.s.is_some() && self.t.is_some()
        } else {
            self.s.is_none() && self.t.is_none()
        }
    }

    // === Utilities ===

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, "GatewayMessage(op={}, t={t}, s={s})", self.op),
            _ => write!(f, "GatewayMessage(op={})", self.op),
        }
    }
}
