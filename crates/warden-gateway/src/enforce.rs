//! Silence enforcement
//!
//! One background task per active silence. While the deadline has not
//! passed, the task polls the member's mute flag and re-asserts it when
//! something (a moderator, state drift) turned it off. When the deadline
//! lapses it clears the flag once and exits. The task holds no socket and
//! terminates on schedule no matter what the REST side does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Mute flag access, the seam between enforcement and the REST collaborator.
///
/// Both operations must be idempotent so a failed call can simply be retried
/// on the next poll tick.
#[async_trait]
pub trait MuteApi: Send + Sync {
    /// Read the target's current server-mute flag.
    async fn get_mute_state(&self, guild_id: &str, user_id: &str) -> anyhow::Result<bool>;

    /// Set the target's server-mute flag.
    async fn set_mute_state(&self, guild_id: &str, user_id: &str, muted: bool)
        -> anyhow::Result<()>;
}

#[async_trait]
impl MuteApi for warden_rest::RestClient {
    async fn get_mute_state(&self, guild_id: &str, user_id: &str) -> anyhow::Result<bool> {
        Ok(self.get_mute(guild_id, user_id).await?)
    }

    async fn set_mute_state(
        &self,
        guild_id: &str,
        user_id: &str,
        muted: bool,
    ) -> anyhow::Result<()> {
        Ok(self.set_mute(guild_id, user_id, muted).await?)
    }
}

/// Keep `(guild, user)` muted until `duration` elapses, then unmute once.
///
/// REST failures are logged and absorbed; the next tick retries. The
/// deadline is wall-clock from entry, so a stretch of failed polls never
/// extends a silence.
pub async fn enforce_silence(
    api: Arc<dyn MuteApi>,
    guild_id: String,
    user_id: String,
    duration: Duration,
    poll_interval: Duration,
) {
    let deadline = Instant::now() + duration;
    let expire = sleep_until(deadline);
    tokio::pin!(expire);

    // First tick fires immediately, asserting the mute up front.
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(%guild_id, %user_id, ?duration, "enforcing silence");

    loop {
        tokio::select! {
            biased;
            () = &mut expire => break,
            _ = ticker.tick() => {
                match api.get_mute_state(&guild_id, &user_id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(%guild_id, %user_id, "mute flag dropped, re-asserting");
                        if let Err(e) = api.set_mute_state(&guild_id, &user_id, true).await {
                            warn!(%guild_id, %user_id, error = %e, "failed to re-assert mute");
                        }
                    }
                    Err(e) => {
                        warn!(%guild_id, %user_id, error = %e, "mute check failed, retrying next tick");
                    }
                }
            }
        }
    }

    // Deadline reached: clear the flag exactly once if it is still set.
    match api.get_mute_state(&guild_id, &user_id).await {
        Ok(true) => {
            if let Err(e) = api.set_mute_state(&guild_id, &user_id, false).await {
                warn!(%guild_id, %user_id, error = %e, "failed to lift mute at deadline");
            } else {
                info!(%guild_id, %user_id, "silence expired, mute lifted");
            }
        }
        Ok(false) => info!(%guild_id, %user_id, "silence expired, already unmuted"),
        Err(e) => warn!(%guild_id, %user_id, error = %e, "final mute check failed"),
    }
}

/// Tracks the enforcement task per silenced target.
///
/// One loop per `(guild, user)`: invoking the command again while a loop is
/// running does not stack a second one. Entries remove themselves when their
/// loop finishes.
#[derive(Default)]
pub struct EnforcementRegistry {
    active: DashMap<(String, String), JoinHandle<()>>,
}

impl EnforcementRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start an enforcement loop for the target unless one is already
    /// running. Returns whether a loop was started.
    pub fn begin(
        self: &Arc<Self>,
        api: Arc<dyn MuteApi>,
        guild_id: String,
        user_id: String,
        duration: Duration,
        poll_interval: Duration,
    ) -> bool {
        use dashmap::mapref::entry::Entry;

        let key = (guild_id.clone(), user_id.clone());
        match self.active.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(%guild_id, %user_id, "enforcement loop already active");
                false
            }
            Entry::Vacant(slot) => {
                let registry = Arc::clone(self);
                let handle = tokio::spawn(async move {
                    enforce_silence(api, guild_id, user_id, duration, poll_interval).await;
                    registry.active.remove(&key);
                });
                slot.insert(handle);
                true
            }
        }
    }

    /// Whether a loop is running for the target.
    #[must_use]
    pub fn is_active(&self, guild_id: &str, user_id: &str) -> bool {
        self.active
            .contains_key(&(guild_id.to_string(), user_id.to_string()))
    }

    /// Number of running loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Abort every running loop (process shutdown).
    pub fn shutdown(&self) {
        self.active.retain(|_, handle| {
            handle.abort();
            false
        });
    }
}
