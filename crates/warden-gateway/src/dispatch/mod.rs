//! Opcode dispatcher
//!
//! Turns each inbound frame into exactly one reaction. Runs inside the read
//! loop's task, strictly in arrival order, never concurrently with itself;
//! anything slow is handed to the event router, which spawns.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::connection::SessionState;
use crate::events::{EventRouter, GatewayEvent};
use crate::heartbeat::Liveness;
use crate::protocol::{GatewayMessage, OpCode};

/// What the read loop should do after a frame has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep reading
    Continue,
    /// Tear this connection down and run the reconnect sequence.
    /// `fresh` means the session must be cleared first (no resume).
    Reconnect { fresh: bool },
}

/// Routes decoded frames by opcode.
pub struct Dispatcher {
    session: Arc<SessionState>,
    liveness: Arc<Liveness>,
    outbound: mpsc::Sender<GatewayMessage>,
    router: Arc<EventRouter>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<SessionState>,
        liveness: Arc<Liveness>,
        outbound: mpsc::Sender<GatewayMessage>,
        router: Arc<EventRouter>,
    ) -> Self {
        Self {
            session,
            liveness,
            outbound,
            router,
        }
    }

    /// Decode and handle one raw frame.
    ///
    /// Frames that fail to decode are logged and dropped; they are never
    /// fatal to the connection.
    pub async fn handle_text(&self, text: &str) -> Action {
        match GatewayMessage::from_json(text) {
            Ok(frame) => self.handle(frame).await,
            Err(e) => {
                tracing::debug!(error = %e, "dropping undecodable frame");
                Action::Continue
            }
        }
    }

    /// Handle one decoded frame.
    pub async fn handle(&self, frame: GatewayMessage) -> Action {
        tracing::trace!(op = %frame.op, "frame received");

        match frame.op {
            OpCode::Dispatch => self.handle_dispatch(frame),

            // The server wants proof of life right now, without waiting for
            // the heartbeat timer.
            OpCode::Heartbeat => {
                let beat = GatewayMessage::heartbeat(self.session.sequence());
                if self.outbound.send(beat).await.is_err() {
                    tracing::warn!("outbound channel closed, cannot answer heartbeat request");
                }
                Action::Continue
            }

            OpCode::HeartbeatAck => {
                self.liveness.ack();
                Action::Continue
            }

            OpCode::Reconnect => {
                tracing::info!("server requested reconnect");
                Action::Reconnect { fresh: false }
            }

            OpCode::InvalidSession => {
                let resumable = frame.invalid_session_resumable().unwrap_or(false);
                tracing::warn!(resumable, "session invalidated");
                Action::Reconnect { fresh: !resumable }
            }

            // Outside the handshake a HELLO means the server restarted the
            // conversation; remember the interval for the next connection.
            OpCode::Hello => {
                if let Some(hello) = frame.as_hello() {
                    self.session.set_heartbeat_interval_ms(hello.heartbeat_interval);
                }
                Action::Continue
            }

            // Client-only opcodes arriving inbound are a server bug
            OpCode::Identify | OpCode::Resume => {
                tracing::warn!(op = %frame.op, "server sent a client-only opcode, dropping");
                Action::Continue
            }
        }
    }

    /// Advance the sequence and route the application event.
    fn handle_dispatch(&self, frame: GatewayMessage) -> Action {
        match frame.s {
            Some(seq) => {
                if !self.session.advance_sequence(seq) {
                    tracing::debug!(
                        seq,
                        stored = self.session.sequence(),
                        "out-of-order dispatch sequence"
                    );
                }
            }
            None => tracing::debug!("dispatch frame without sequence"),
        }

        let Some(name) = frame.event_name() else {
            tracing::debug!("dispatch frame without event name, dropping");
            return Action::Continue;
        };

        match GatewayEvent::parse(name, frame.d.as_ref()) {
            Ok(event) => self.router.route(event),
            Err(e) => {
                // Sequence already advanced; the payload alone is discarded.
                tracing::warn!(event = name, error = %e, "dropping malformed dispatch payload");
            }
        }

        Action::Continue
    }
}
