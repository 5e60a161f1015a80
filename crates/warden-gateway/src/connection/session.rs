//! Session state
//!
//! The single record of where this client stands with the gateway: last
//! processed sequence, session identity, resume target, and the heartbeat
//! interval announced at HELLO. One lock guards all of it; the dispatcher
//! and connection manager write, the heartbeat monitor reads.

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct SessionInner {
    sequence: u64,
    session_id: String,
    resume_url: String,
    heartbeat_interval_ms: u64,
}

/// Shared session state for one logical gateway client.
///
/// Outlives individual socket connections; a resume carries it across.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<SessionInner>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last processed dispatch sequence.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.inner.read().sequence
    }

    /// Raise the sequence to `seq` if it is higher than the stored value.
    ///
    /// The monotonic invariant is enforced here at the write site: a frame
    /// arriving with a lower sequence is still processed, but never moves
    /// the stored value backwards. Returns whether the value advanced.
    pub fn advance_sequence(&self, seq: u64) -> bool {
        let mut inner = self.inner.write();
        if seq > inner.sequence {
            inner.sequence = seq;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn session_id(&self) -> String {
        self.inner.read().session_id.clone()
    }

    #[must_use]
    pub fn resume_url(&self) -> String {
        self.inner.read().resume_url.clone()
    }

    /// Store the identity handed out by a READY dispatch.
    pub fn set_identity(&self, session_id: impl Into<String>, resume_url: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.session_id = session_id.into();
        inner.resume_url = resume_url.into();
    }

    /// Heartbeat cadence in milliseconds (0 before the first HELLO).
    #[must_use]
    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.inner.read().heartbeat_interval_ms
    }

    pub fn set_heartbeat_interval_ms(&self, interval: u64) {
        self.inner.write().heartbeat_interval_ms = interval;
    }

    /// Whether enough identity survives to attempt a resume.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        let inner = self.inner.read();
        !inner.session_id.is_empty() && !inner.resume_url.is_empty()
    }

    /// Session id and sequence for a resume frame, if resumable.
    #[must_use]
    pub fn resume_params(&self) -> Option<(String, u64)> {
        let inner = self.inner.read();
        if inner.session_id.is_empty() || inner.resume_url.is_empty() {
            return None;
        }
        Some((inner.session_id.clone(), inner.sequence))
    }

    /// Forget the session. Called before a fresh identify, so the next
    /// connection starts from `(0, "", "")`.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.sequence = 0;
        inner.session_id.clear();
        inner.resume_url.clear();
    }
}
