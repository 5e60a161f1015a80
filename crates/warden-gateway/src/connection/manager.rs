//! Gateway connection manager
//!
//! Owns the socket and the tasks around it. `connect` dials, walks the
//! handshake to READY/RESUMED, then hands the split socket to a writer, a
//! read loop, and a heartbeat monitor. Failures from any of them funnel into
//! one single-flight reconnect sequence with exponential backoff; the
//! manager never gives up while the process is alive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::dispatch::{Action, Dispatcher};
use crate::events::{EventRouter, EventType, ReadyEvent};
use crate::heartbeat::{self, HeartbeatOutcome, Liveness};
use crate::protocol::{
    CloseCode, GatewayMessage, IdentifyPayload, Intents, OpCode, ResumePayload,
};
use crate::transport::{Transport, TransportError, TransportReader, TransportWriter};

use super::SessionState;

/// Outbound frames queued towards the writer task
const OUTBOUND_BUFFER: usize = 100;

/// How long teardown waits for tasks to finish before aborting them
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Where the connection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Handshaking,
    Identifying,
    Resuming,
    Ready,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Handshaking => "handshaking",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Reconnect backoff policy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// First retry delay; doubles per attempt.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Attempts before the session is cleared and the counter restarts
    /// (0 = never clear).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Delay before the k-th attempt (1-based): `min(base * 2^(k-1), cap)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doubled = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1).min(16)));
        doubled.min(self.max_delay)
    }
}

/// Everything the client needs to dial and authenticate.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Websocket URL from the discovery endpoint
    pub discovery_url: String,
    /// Bot token sent in identify/resume frames
    pub token: String,
    /// Event-group subscriptions
    pub intents: Intents,
    /// Gateway protocol version for the URL query
    pub gateway_version: u8,
    /// Backoff policy
    pub reconnect: ReconnectConfig,
}

impl GatewayConfig {
    /// Full websocket URL for a base (discovery or resume).
    #[must_use]
    fn ws_url(&self, base: &str) -> String {
        format!(
            "{}/?v={}&encoding=json",
            base.trim_end_matches('/'),
            self.gateway_version
        )
    }
}

/// Gateway connection errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server broke the handshake contract for this attempt
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One live socket's scaffolding
struct ActiveConnection {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

struct ClientInner {
    config: GatewayConfig,
    session: Arc<SessionState>,
    router: Arc<EventRouter>,
    state_tx: watch::Sender<ConnectionState>,
    /// Single-flight guard: only one reconnect sequence at a time
    reconnecting: AtomicBool,
    /// Set by `close`; suppresses further reconnects
    closed: AtomicBool,
    active: Mutex<Option<ActiveConnection>>,
}

/// The gateway client. Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig, router: Arc<EventRouter>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ClientInner {
                config,
                session: Arc::new(SessionState::new()),
                router,
                state_tx,
                reconnecting: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                active: Mutex::new(None),
            }),
        }
    }

    /// Shared session state (sequence, identity, resume target).
    #[must_use]
    pub fn session(&self) -> Arc<SessionState> {
        Arc::clone(&self.inner.session)
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Dial, perform the handshake, and start the connection tasks.
    ///
    /// Returns once the session is ready; the read, write, and heartbeat
    /// loops keep running in the background.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        self.inner.closed.store(false, Ordering::SeqCst);
        self.establish().await
    }

    /// Tear everything down deterministically. No frame is sent or received
    /// after this returns.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.teardown_active().await;
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("gateway client closed");
    }

    /// Kick off the reconnect sequence unless one is already running.
    ///
    /// Safe to call from anywhere, any number of times; concurrent triggers
    /// (a write failure racing a read failure) collapse into one attempt.
    pub fn request_reconnect(&self) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        if !self.try_begin_reconnect() {
            tracing::debug!("reconnect already in flight");
            return;
        }

        let client = self.clone();
        tokio::spawn(async move {
            client.run_reconnect_loop().await;
            client.finish_reconnect();
        });
    }

    /// Claim the single-flight guard. Returns whether this caller owns the
    /// reconnect sequence.
    fn try_begin_reconnect(&self) -> bool {
        self.inner
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn finish_reconnect(&self) {
        self.inner.reconnecting.store(false, Ordering::SeqCst);
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::info!("connection state: {current} -> {state}");
            *current = state;
            true
        });
    }

    /// One full connection attempt: dial, handshake, spawn loops.
    async fn establish(&self) -> Result<(), GatewayError> {
        let inner = &self.inner;
        self.set_state(ConnectionState::Handshaking);

        let base = if inner.session.is_resumable() {
            inner.session.resume_url()
        } else {
            inner.config.discovery_url.clone()
        };
        let url = inner.config.ws_url(&base);
        let mut transport = Transport::dial(&url).await?;

        // Step 1: the first frame must be HELLO.
        let frame = GatewayMessage::from_json(&transport.receive().await?)?;
        let hello = frame.as_hello().ok_or_else(|| {
            GatewayError::Protocol(format!("expected HELLO as first frame, got {}", frame.op))
        })?;
        inner.session.set_heartbeat_interval_ms(hello.heartbeat_interval);

        // Steps 2-3: resume when we can, identify otherwise.
        if let Some((session_id, seq)) = inner.session.resume_params() {
            self.set_state(ConnectionState::Resuming);
            let payload = ResumePayload {
                token: inner.config.token.clone(),
                session_id,
                seq,
            };
            transport
                .send(GatewayMessage::resume(&payload).to_json()?)
                .await?;

            let reply = GatewayMessage::from_json(&transport.receive().await?)?;
            if reply.op == OpCode::InvalidSession {
                tracing::warn!("resume rejected, falling back to a fresh identify");
                inner.session.clear();
                self.identify(&mut transport).await?;
            } else if reply.is_dispatch() && reply.event_name() == Some(EventType::Resumed.as_str())
            {
                if let Some(s) = reply.s {
                    inner.session.advance_sequence(s);
                }
                tracing::info!(sequence = inner.session.sequence(), "session resumed");
            } else {
                return Err(GatewayError::Protocol(format!(
                    "unexpected reply to resume: {reply}"
                )));
            }
        } else {
            self.identify(&mut transport).await?;
        }

        // Step 4: hand the socket to the connection tasks.
        self.start_tasks(transport).await;
        self.set_state(ConnectionState::Ready);
        Ok(())
    }

    /// Send IDENTIFY and wait for the READY dispatch carrying our new
    /// session identity.
    async fn identify(&self, transport: &mut Transport) -> Result<(), GatewayError> {
        let inner = &self.inner;
        self.set_state(ConnectionState::Identifying);

        let payload = IdentifyPayload::new(inner.config.token.clone(), inner.config.intents);
        transport
            .send(GatewayMessage::identify(&payload).to_json()?)
            .await?;

        let reply = GatewayMessage::from_json(&transport.receive().await?)?;
        if !(reply.is_dispatch() && reply.event_name() == Some(EventType::Ready.as_str())) {
            return Err(GatewayError::Protocol(format!(
                "expected READY after identify, got {reply}"
            )));
        }

        if let Some(s) = reply.s {
            inner.session.advance_sequence(s);
        }
        let ready: ReadyEvent =
            serde_json::from_value(reply.d.unwrap_or(serde_json::Value::Null))?;
        inner
            .session
            .set_identity(&ready.session_id, &ready.resume_gateway_url);
        inner.router.on_ready(&ready);
        Ok(())
    }

    /// Split the socket and spawn writer, read, and heartbeat tasks under a
    /// fresh shutdown scope. Tasks of a superseded connection keep their old
    /// scope and can never touch this socket.
    async fn start_tasks(&self, transport: Transport) {
        let inner = &self.inner;
        let (writer, reader) = transport.split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let liveness = Arc::new(Liveness::new());
        let handle = ReconnectHandle {
            inner: Arc::downgrade(&self.inner),
        };

        let dispatcher = Dispatcher::new(
            Arc::clone(&inner.session),
            Arc::clone(&liveness),
            outbound_tx.clone(),
            Arc::clone(&inner.router),
        );

        let write_task = tokio::spawn(write_loop(
            writer,
            outbound_rx,
            shutdown_rx.clone(),
            handle.clone(),
        ));
        let read_task = tokio::spawn(read_loop(
            reader,
            dispatcher,
            shutdown_rx.clone(),
            handle.clone(),
            Arc::clone(&inner.session),
        ));

        let hb_session = Arc::clone(&inner.session);
        let hb_handle = handle.clone();
        let heartbeat_task = tokio::spawn(async move {
            match heartbeat::run(hb_session, liveness, outbound_tx, shutdown_rx).await {
                HeartbeatOutcome::Shutdown => {}
                HeartbeatOutcome::Zombied | HeartbeatOutcome::ChannelClosed => {
                    hb_handle.request_reconnect();
                }
            }
        });

        let stale = inner.active.lock().await.replace(ActiveConnection {
            shutdown: shutdown_tx,
            tasks: vec![write_task, read_task, heartbeat_task],
        });

        // Normally torn down before establish; this catches a connect racing
        // a dying connection.
        if let Some(stale) = stale {
            let _ = stale.shutdown.send(true);
            for task in stale.tasks {
                task.abort();
            }
        }
    }

    /// Bounded backoff loop. Exhausting the ceiling clears the session
    /// (forcing a fresh identify) and restarts the counter.
    async fn run_reconnect_loop(&self) {
        self.set_state(ConnectionState::Reconnecting);
        self.teardown_active().await;

        let policy = self.inner.config.reconnect.clone();
        let mut attempt: u32 = 0;

        loop {
            if self.inner.closed.load(Ordering::SeqCst) {
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            attempt += 1;
            if policy.max_attempts > 0 && attempt > policy.max_attempts {
                tracing::warn!(
                    attempts = policy.max_attempts,
                    "retry ceiling reached, clearing session for a fresh identify"
                );
                self.inner.session.clear();
                attempt = 1;
            }

            let delay = policy.delay_for_attempt(attempt);
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::time::sleep(delay).await;

            if self.inner.closed.load(Ordering::SeqCst) {
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            match self.establish().await {
                Ok(()) => {
                    tracing::info!(attempt, "reconnected");
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "reconnect attempt failed");
                    self.set_state(ConnectionState::Reconnecting);
                }
            }
        }
    }

    /// Stop the current connection's tasks within the grace period.
    async fn teardown_active(&self) {
        let Some(active) = self.inner.active.lock().await.take() else {
            return;
        };
        let _ = active.shutdown.send(true);

        let aborts: Vec<_> = active.tasks.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(
            SHUTDOWN_GRACE,
            futures_util::future::join_all(active.tasks),
        )
        .await;
        if joined.is_err() {
            tracing::debug!("connection tasks exceeded the grace period, aborting");
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

/// Weak handle the connection tasks use to report failure.
///
/// Weak so a dropped client does not stay alive through its own tasks.
#[derive(Clone)]
struct ReconnectHandle {
    inner: Weak<ClientInner>,
}

impl ReconnectHandle {
    fn request_reconnect(&self) {
        if let Some(inner) = self.inner.upgrade() {
            GatewayClient { inner }.request_reconnect();
        }
    }
}

/// Drain the outbound channel into the socket.
///
/// When this task dies, every queued sender sees a closed channel, so a
/// stale component can never write to a superseded socket.
async fn write_loop(
    mut writer: TransportWriter,
    mut outbound: mpsc::Receiver<GatewayMessage>,
    mut shutdown: watch::Receiver<bool>,
    handle: ReconnectHandle,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                // A dropped sender counts as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    writer.close().await;
                    return;
                }
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    writer.close().await;
                    return;
                };
                let json = match frame.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unencodable outbound frame");
                        continue;
                    }
                };
                if let Err(e) = writer.send(json).await {
                    tracing::warn!(error = %e, "write failed");
                    handle.request_reconnect();
                    return;
                }
            }
        }
    }
}

/// Drain inbound frames through the dispatcher until the socket dies or the
/// shutdown signal fires.
async fn read_loop(
    mut reader: TransportReader,
    dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
    handle: ReconnectHandle,
    session: Arc<SessionState>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
            received = reader.receive() => match received {
                Ok(text) => match dispatcher.handle_text(&text).await {
                    Action::Continue => {}
                    Action::Reconnect { fresh } => {
                        if fresh {
                            session.clear();
                        }
                        handle.request_reconnect();
                        return;
                    }
                },
                Err(e) => {
                    match e.close_code().and_then(CloseCode::from_u16) {
                        Some(code) if !code.should_reconnect() => {
                            // Dialing again with the same credentials will
                            // fail the same way; log loudly and retry with a
                            // clean slate anyway.
                            tracing::error!(%code, "gateway refused the connection; check token and intents");
                            session.clear();
                        }
                        Some(code) => {
                            if !code.can_resume() {
                                session.clear();
                            }
                            tracing::warn!(%code, "gateway closed the connection");
                        }
                        None => tracing::warn!(error = %e, "transport error"),
                    }
                    handle.request_reconnect();
                    return;
                }
            }
        }
    }
}
