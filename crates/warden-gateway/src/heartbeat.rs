//! Heartbeat monitor
//!
//! A timer task per connection that sends a liveness frame carrying the last
//! processed sequence. The first beat lands at a random point inside the
//! interval so a fleet of restarting clients does not thump the server in
//! unison. Runs independently of the read path; the dispatcher feeds ACKs
//! back through [`Liveness`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::connection::SessionState;
use crate::protocol::GatewayMessage;

/// Ack state shared between the heartbeat task and the dispatcher.
#[derive(Debug)]
pub struct Liveness {
    acked: AtomicBool,
}

impl Liveness {
    #[must_use]
    pub fn new() -> Self {
        // Nothing outstanding before the first beat
        Self {
            acked: AtomicBool::new(true),
        }
    }

    /// The server acknowledged the outstanding beat.
    pub fn ack(&self) {
        self.acked.store(true, Ordering::SeqCst);
    }

    /// A beat went out; an ACK is now owed.
    pub fn mark_sent(&self) {
        self.acked.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the heartbeat task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The connection-scoped shutdown signal fired
    Shutdown,
    /// A full interval passed with no ACK for the last beat
    Zombied,
    /// The writer task went away; the connection is already dead
    ChannelClosed,
}

/// Run the heartbeat loop for one connection.
///
/// Returns instead of acting on failure: the caller decides whether the
/// outcome warrants a reconnect. Cancellation rides the same `shutdown`
/// signal as the read loop, so a beat is never sent on a socket the manager
/// already considers gone.
pub async fn run(
    session: Arc<SessionState>,
    liveness: Arc<Liveness>,
    outbound: mpsc::Sender<GatewayMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> HeartbeatOutcome {
    let interval = Duration::from_millis(session.heartbeat_interval_ms().max(1));

    // First beat at a random offset within [0, interval)
    let jitter = rand::thread_rng().gen_range(Duration::ZERO..interval);
    debug!(?interval, ?jitter, "heartbeat monitor started");

    tokio::select! {
        _ = shutdown.changed() => return HeartbeatOutcome::Shutdown,
        () = sleep(jitter) => {}
    }

    loop {
        let beat = GatewayMessage::heartbeat(session.sequence());
        if outbound.send(beat).await.is_err() {
            return HeartbeatOutcome::ChannelClosed;
        }
        liveness.mark_sent();
        trace!(sequence = session.sequence(), "heartbeat sent");

        tokio::select! {
            _ = shutdown.changed() => return HeartbeatOutcome::Shutdown,
            () = sleep(interval) => {}
        }

        if !liveness.is_acked() {
            warn!("heartbeat not acknowledged within one interval, connection is zombied");
            return HeartbeatOutcome::Zombied;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OpCode;

    fn test_session(interval_ms: u64) -> Arc<SessionState> {
        let session = Arc::new(SessionState::new());
        session.set_heartbeat_interval_ms(interval_ms);
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_beat_lands_within_one_interval() {
        let session = test_session(45_000);
        session.advance_sequence(7);
        let (tx, mut rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            session,
            Arc::new(Liveness::new()),
            tx,
            shutdown_rx,
        ));

        let started = tokio::time::Instant::now();
        let beat = rx.recv().await.unwrap();
        assert_eq!(beat.op, OpCode::Heartbeat);
        assert_eq!(beat.d, Some(serde_json::json!(7)));
        assert!(started.elapsed() < Duration::from_millis(45_000));

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacked_beat_zombies_the_connection() {
        let session = test_session(1_000);
        let (tx, mut rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            session,
            Arc::new(Liveness::new()),
            tx,
            shutdown_rx,
        ));

        // Swallow the first beat and never ACK it
        let _ = rx.recv().await.unwrap();
        assert_eq!(task.await.unwrap(), HeartbeatOutcome::Zombied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acked_beats_keep_the_loop_alive() {
        let session = test_session(1_000);
        let liveness = Arc::new(Liveness::new());
        let (tx, mut rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(session, liveness.clone(), tx, shutdown_rx));

        // ACK several consecutive beats
        for _ in 0..3 {
            let _ = rx.recv().await.unwrap();
            liveness.ack();
        }

        shutdown_tx.send(true).unwrap();
        assert_eq!(task.await.unwrap(), HeartbeatOutcome::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_stops_the_loop() {
        let session = test_session(1_000);
        let (tx, rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(rx);

        let outcome = run(session, Arc::new(Liveness::new()), tx, shutdown_rx).await;
        assert_eq!(outcome, HeartbeatOutcome::ChannelClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_first_beat() {
        let session = test_session(60_000);
        let (tx, mut rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            session,
            Arc::new(Liveness::new()),
            tx,
            shutdown_rx,
        ));

        // Cancel during the jitter wait; no beat may be sent afterwards
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();

        assert_eq!(task.await.unwrap(), HeartbeatOutcome::Shutdown);
        assert!(rx.try_recv().is_err());
    }
}
