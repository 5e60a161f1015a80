//! Gateway client integration tests
//!
//! Each test scripts the server side of the conversation against the real
//! client: handshake ordering, resume bookkeeping, invalid-session fallback,
//! and the moderation flow from interaction to enforcement.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use integration_tests::{memory_repository, RecordingApi, ServerConn, TestGateway};
use warden_db::SilenceRepository;
use warden_gateway::protocol::Intents;
use warden_gateway::{
    ConnectionState, EnforcementRegistry, EventRouter, GatewayClient, GatewayConfig,
    ReconnectConfig,
};

const TOKEN: &str = "test-token";

struct Setup {
    gateway: TestGateway,
    client: GatewayClient,
    registry: Arc<EnforcementRegistry>,
    api: Arc<RecordingApi>,
    silences: Arc<warden_db::SqliteSilenceRepository>,
}

async fn setup() -> Result<Setup> {
    let gateway = TestGateway::spawn().await?;
    let silences = memory_repository().await;
    let api = RecordingApi::new();
    let registry = EnforcementRegistry::new();
    let router = EventRouter::new(
        silences.clone(),
        api.clone(),
        api.clone(),
        registry.clone(),
        Duration::from_millis(50),
    );

    let client = GatewayClient::new(
        GatewayConfig {
            discovery_url: gateway.url.clone(),
            token: TOKEN.into(),
            intents: Intents::moderation(),
            gateway_version: 10,
            reconnect: ReconnectConfig {
                base_delay: Duration::from_millis(50),
                max_delay: Duration::from_millis(200),
                max_attempts: 5,
            },
        },
        router,
    );

    Ok(Setup {
        gateway,
        client,
        registry,
        api,
        silences,
    })
}

/// Drive the fresh-session handshake from the server side while the client
/// connects. Returns the established connection.
async fn fresh_handshake(setup: &mut Setup, heartbeat_ms: u64) -> Result<ServerConn> {
    let url = setup.gateway.url.clone();
    let client = setup.client.clone();

    let script = async {
        let mut conn = setup.gateway.next_conn().await?;
        conn.send_hello(heartbeat_ms).await?;

        let identify = conn.expect_op(2).await?;
        assert_eq!(identify["d"]["token"], TOKEN);
        assert_eq!(identify["d"]["intents"], Intents::moderation().bits());

        conn.send_ready("sess-1", &url, 1).await?;
        Ok::<_, anyhow::Error>(conn)
    };

    let (connected, conn) = tokio::join!(client.connect(), script);
    connected?;
    Ok(conn?)
}

/// Poll until `predicate` holds, failing the test after a few seconds.
async fn wait_until(mut predicate: impl FnMut() -> bool) {
    for _ in 0..500 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn fresh_session_identifies_before_any_heartbeat() -> Result<()> {
    let mut setup = setup().await?;

    // fresh_handshake asserts the first client frame is IDENTIFY; with a
    // short interval the very next frame must be a heartbeat.
    let mut conn = fresh_handshake(&mut setup, 250).await?;

    assert_eq!(setup.client.state(), ConnectionState::Ready);
    let session = setup.client.session();
    assert_eq!(session.session_id(), "sess-1");
    assert_eq!(session.sequence(), 1);

    let beat = conn.expect_op(1).await?;
    assert_eq!(beat["d"], json!(1));

    setup.client.close().await;
    Ok(())
}

#[tokio::test]
async fn resume_carries_session_id_and_last_sequence() -> Result<()> {
    let mut setup = setup().await?;
    let mut conn = fresh_handshake(&mut setup, 60_000).await?;

    // Advance the session, then kill the connection with a resumable code.
    conn.send_dispatch("GUILD_CREATE", 42, json!({ "id": "g1" }))
        .await?;
    let session = setup.client.session();
    wait_until(|| session.sequence() == 42).await;

    conn.close_with(4000, "server hiccup").await?;

    // The client dials the resume URL and resumes with exact bookkeeping.
    let mut conn = setup.gateway.next_conn().await?;
    conn.send_hello(60_000).await?;

    let resume = conn.expect_op(6).await?;
    assert_eq!(resume["d"]["session_id"], "sess-1");
    assert_eq!(resume["d"]["seq"], 42);
    assert_eq!(resume["d"]["token"], TOKEN);

    conn.send_dispatch("RESUMED", 43, json!(null)).await?;
    let client = setup.client.clone();
    wait_until(move || client.state() == ConnectionState::Ready).await;

    // No fresh identify happened, so the session identity survived.
    assert_eq!(setup.client.session().session_id(), "sess-1");

    setup.client.close().await;
    Ok(())
}

#[tokio::test]
async fn rejected_resume_falls_back_to_identify() -> Result<()> {
    let mut setup = setup().await?;
    let conn = fresh_handshake(&mut setup, 60_000).await?;
    conn.drop_abruptly();

    let mut conn = setup.gateway.next_conn().await?;
    conn.send_hello(60_000).await?;

    // Refuse the resume outright.
    conn.expect_op(6).await?;
    conn.send_frame(json!({ "op": 9, "d": false })).await?;

    // Same connection: the client must identify from scratch.
    let identify = conn.expect_op(2).await?;
    assert_eq!(identify["d"]["token"], TOKEN);

    conn.send_ready("sess-2", &setup.gateway.url.clone(), 1).await?;

    let client = setup.client.clone();
    wait_until(move || client.state() == ConnectionState::Ready).await;
    let session = setup.client.session();
    assert_eq!(session.session_id(), "sess-2");
    assert_eq!(session.sequence(), 1);

    setup.client.close().await;
    Ok(())
}

#[tokio::test]
async fn server_requested_heartbeat_is_answered() -> Result<()> {
    let mut setup = setup().await?;
    let mut conn = fresh_handshake(&mut setup, 60_000).await?;

    conn.send_dispatch("GUILD_CREATE", 7, json!({ "id": "g1" }))
        .await?;
    let session = setup.client.session();
    wait_until(|| session.sequence() == 7).await;

    conn.send_frame(json!({ "op": 1 })).await?;

    // The reply is immediate, but a coincidental timer beat may slip in
    // ahead of it; accept the first beat carrying the current sequence.
    let mut answered = false;
    for _ in 0..3 {
        let beat = conn.expect_op(1).await?;
        if beat["d"] == json!(7) {
            answered = true;
            break;
        }
    }
    assert!(answered, "no heartbeat reply carrying the current sequence");

    setup.client.close().await;
    Ok(())
}

#[tokio::test]
async fn silence_interaction_starts_enforcement_and_sweeps_messages() -> Result<()> {
    let mut setup = setup().await?;
    let mut conn = fresh_handshake(&mut setup, 60_000).await?;

    conn.send_dispatch(
        "INTERACTION_CREATE",
        2,
        json!({
            "guild_id": "g1",
            "data": {
                "name": "silence",
                "options": [{
                    "name": "user",
                    "type": 1,
                    "options": [
                        { "name": "username", "type": 6, "value": "u1" },
                        { "name": "duration", "type": 4, "value": 1 },
                    ],
                }],
            },
        }),
    )
    .await?;

    // The enforcement loop's first poll sees the flag down and asserts it.
    let api = setup.api.clone();
    wait_until(move || api.set_calls().contains(&true)).await;
    assert!(setup.registry.is_active("g1", "u1"));
    assert!(setup.silences.exists("u1").await?);

    // A message from the silenced user is removed on arrival.
    conn.send_dispatch(
        "MESSAGE_CREATE",
        3,
        json!({
            "id": "m1",
            "channel_id": "c1",
            "guild_id": "g1",
            "author": { "id": "u1", "username": "loudmouth" },
        }),
    )
    .await?;

    let api = setup.api.clone();
    wait_until(move || !api.deleted().is_empty()).await;
    assert_eq!(setup.api.deleted()[0], ("c1".to_string(), "m1".to_string()));

    setup.client.close().await;
    setup.registry.shutdown();
    Ok(())
}

#[tokio::test]
async fn server_reconnect_request_triggers_a_resume() -> Result<()> {
    let mut setup = setup().await?;
    let mut conn = fresh_handshake(&mut setup, 60_000).await?;

    conn.send_frame(json!({ "op": 7, "d": null })).await?;

    // The client tears down and comes back resuming the same session.
    let mut conn = setup.gateway.next_conn().await?;
    conn.send_hello(60_000).await?;
    let resume = conn.expect_op(6).await?;
    assert_eq!(resume["d"]["session_id"], "sess-1");

    conn.send_dispatch("RESUMED", 2, json!(null)).await?;
    let client = setup.client.clone();
    wait_until(move || client.state() == ConnectionState::Ready).await;

    setup.client.close().await;
    Ok(())
}
