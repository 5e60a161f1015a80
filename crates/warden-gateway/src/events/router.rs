//! Event router
//!
//! Takes typed dispatch events from the opcode dispatcher and reacts to
//! them. Runs on the read loop's task, so anything that touches the network
//! or the database is spawned; routing itself never blocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use warden_db::SilenceRepository;

use crate::enforce::{EnforcementRegistry, MuteApi};

use super::{GatewayEvent, InteractionEvent, MessageEvent, ReadyEvent};

/// Message removal, the router's second REST seam.
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Delete a message from a channel.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl MessageApi for warden_rest::RestClient {
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> anyhow::Result<()> {
        Ok(warden_rest::RestClient::delete_message(self, channel_id, message_id).await?)
    }
}

/// Routes application events to their handlers.
pub struct EventRouter {
    silences: Arc<dyn SilenceRepository>,
    mute_api: Arc<dyn MuteApi>,
    messages: Arc<dyn MessageApi>,
    registry: Arc<EnforcementRegistry>,
    poll_interval: Duration,
    /// The bot's own user id, captured from READY
    bot_user: RwLock<Option<String>>,
}

impl EventRouter {
    pub fn new(
        silences: Arc<dyn SilenceRepository>,
        mute_api: Arc<dyn MuteApi>,
        messages: Arc<dyn MessageApi>,
        registry: Arc<EnforcementRegistry>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            silences,
            mute_api,
            messages,
            registry,
            poll_interval,
            bot_user: RwLock::new(None),
        })
    }

    /// Bookkeeping for a READY dispatch. Also called by the connection
    /// manager when READY arrives during the handshake.
    pub fn on_ready(&self, ready: &ReadyEvent) {
        if let Some(user) = &ready.user {
            *self.bot_user.write() = Some(user.id.clone());
        }
        info!(session_id = %ready.session_id, "session ready");
    }

    /// React to one event. Never blocks; I/O work is spawned.
    pub fn route(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready(ready) => self.on_ready(&ready),
            GatewayEvent::Resumed => info!("session resumed"),
            GatewayEvent::GuildCreate => info!("guild available"),
            GatewayEvent::MessageCreate(msg) => {
                let silences = Arc::clone(&self.silences);
                let messages = Arc::clone(&self.messages);
                let bot_user = self.bot_user.read().clone();
                tokio::spawn(async move {
                    Self::on_message(silences, messages, bot_user, msg).await;
                });
            }
            GatewayEvent::InteractionCreate(interaction) => {
                let silences = Arc::clone(&self.silences);
                let mute_api = Arc::clone(&self.mute_api);
                let registry = Arc::clone(&self.registry);
                let poll_interval = self.poll_interval;
                let bot_user = self.bot_user.read().clone();
                tokio::spawn(async move {
                    Self::on_interaction(
                        silences,
                        mute_api,
                        registry,
                        poll_interval,
                        bot_user,
                        interaction,
                    )
                    .await;
                });
            }
            GatewayEvent::Unknown(name) => debug!(event = %name, "unhandled event"),
        }
    }

    /// Lazy sweep on every inbound message: expired records go, and anything
    /// a still-silenced user managed to send is removed.
    pub(crate) async fn on_message(
        silences: Arc<dyn SilenceRepository>,
        messages: Arc<dyn MessageApi>,
        bot_user: Option<String>,
        msg: MessageEvent,
    ) {
        if msg.author.bot || bot_user.as_deref() == Some(msg.author.id.as_str()) {
            return;
        }

        if let Err(e) = silences.delete_expired(Utc::now()).await {
            warn!(error = %e, "silence sweep failed");
        }

        match silences.exists(&msg.author.id).await {
            Ok(true) => {
                debug!(author = %msg.author.id, message = %msg.id, "removing message from silenced user");
                if let Err(e) = messages.delete_message(&msg.channel_id, &msg.id).await {
                    warn!(message = %msg.id, error = %e, "failed to delete message");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(author = %msg.author.id, error = %e, "silence lookup failed"),
        }
    }

    /// Handle a slash-command invocation.
    pub(crate) async fn on_interaction(
        silences: Arc<dyn SilenceRepository>,
        mute_api: Arc<dyn MuteApi>,
        registry: Arc<EnforcementRegistry>,
        poll_interval: Duration,
        bot_user: Option<String>,
        interaction: InteractionEvent,
    ) {
        let Some(request) = interaction.silence_request() else {
            debug!(command = %interaction.data.name, "ignoring interaction");
            return;
        };

        if bot_user.as_deref() == Some(request.user_id.as_str()) {
            warn!("refusing to silence the bot itself");
            return;
        }

        info!(
            user_id = %request.user_id,
            guild_id = %request.guild_id,
            minutes = request.minutes,
            "silence requested"
        );

        let duration = Duration::from_secs(request.minutes as u64 * 60);
        let expires_at = Utc::now() + chrono::Duration::minutes(request.minutes);

        if let Err(e) = silences
            .insert(&request.user_id, &request.guild_id, expires_at)
            .await
        {
            // The enforcement loop still runs; only the durable record is lost.
            warn!(error = %e, "failed to persist silence record");
        }

        registry.begin(
            mute_api,
            request.guild_id,
            request.user_id,
            duration,
            poll_interval,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::{FakeMessageApi, FakeMuteApi, MemorySilenceRepo};

    fn message(author_id: &str, bot: bool) -> MessageEvent {
        serde_json::from_value(serde_json::json!({
            "id": "m1",
            "channel_id": "c1",
            "guild_id": "g1",
            "author": { "id": author_id, "bot": bot },
        }))
        .unwrap()
    }

    fn silence_interaction(user_id: &str, minutes: i64) -> InteractionEvent {
        serde_json::from_value(serde_json::json!({
            "guild_id": "g1",
            "data": {
                "name": "silence",
                "options": [{
                    "name": "user",
                    "type": 1,
                    "options": [
                        { "name": "username", "type": 6, "value": user_id },
                        { "name": "duration", "type": 4, "value": minutes },
                    ],
                }],
            },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_message_from_silenced_user_is_deleted() {
        let silences = MemorySilenceRepo::with_user("u1");
        let messages = Arc::new(FakeMessageApi::default());

        EventRouter::on_message(
            silences,
            messages.clone(),
            Some("bot".into()),
            message("u1", false),
        )
        .await;

        assert_eq!(messages.deleted(), vec![("c1".to_string(), "m1".to_string())]);
    }

    #[tokio::test]
    async fn test_message_from_clean_user_is_left_alone() {
        let silences = MemorySilenceRepo::with_user("someone-else");
        let messages = Arc::new(FakeMessageApi::default());

        EventRouter::on_message(silences, messages.clone(), None, message("u1", false)).await;

        assert!(messages.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_bot_messages_skip_the_sweep() {
        let silences = MemorySilenceRepo::with_user("bot");
        let messages = Arc::new(FakeMessageApi::default());

        EventRouter::on_message(
            silences.clone(),
            messages.clone(),
            Some("bot".into()),
            message("bot", false),
        )
        .await;
        EventRouter::on_message(silences, messages.clone(), None, message("u2", true)).await;

        assert!(messages.deleted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interaction_persists_and_starts_enforcement() {
        let silences = MemorySilenceRepo::empty();
        let registry = EnforcementRegistry::new();
        let mute_api = Arc::new(FakeMuteApi::default());

        EventRouter::on_interaction(
            silences.clone(),
            mute_api,
            registry.clone(),
            Duration::from_secs(3),
            Some("bot".into()),
            silence_interaction("u1", 2),
        )
        .await;

        assert!(silences.exists("u1").await.unwrap());
        assert!(registry.is_active("g1", "u1"));
        registry.shutdown();
    }

    #[tokio::test]
    async fn test_interaction_refuses_to_silence_the_bot() {
        let silences = MemorySilenceRepo::empty();
        let registry = EnforcementRegistry::new();
        let mute_api = Arc::new(FakeMuteApi::default());

        EventRouter::on_interaction(
            silences.clone(),
            mute_api,
            registry.clone(),
            Duration::from_secs(3),
            Some("bot".into()),
            silence_interaction("bot", 2),
        )
        .await;

        assert!(!silences.exists("bot").await.unwrap());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_non_silence_interaction_is_ignored() {
        let silences = MemorySilenceRepo::empty();
        let registry = EnforcementRegistry::new();
        let mute_api = Arc::new(FakeMuteApi::default());

        let interaction: InteractionEvent = serde_json::from_value(serde_json::json!({
            "guild_id": "g1",
            "data": { "name": "ping" },
        }))
        .unwrap();

        EventRouter::on_interaction(
            silences,
            mute_api,
            registry.clone(),
            Duration::from_secs(3),
            None,
            interaction,
        )
        .await;

        assert!(registry.is_empty());
    }
}
