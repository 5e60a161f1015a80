//! Warden entry point
//!
//! Run with:
//! ```bash
//! cargo run -p warden-gateway
//! ```
//!
//! Configuration is loaded from environment variables (`BOT_TOKEN` and
//! `APP_ID` are required; see `warden_common::config`).

use std::sync::Arc;

use tracing::{error, info, warn};

use warden_common::{try_init_tracing, AppConfig, TracingConfig, WardenError};
use warden_db::{SilenceRepository, SqliteSilenceRepository};
use warden_gateway::{
    EnforcementRegistry, EventRouter, GatewayClient, GatewayConfig, ReconnectConfig,
};
use warden_rest::endpoints::commands::silence_command;
use warden_rest::RestClient;

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing(TracingConfig::default()) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "warden failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), WardenError> {
    info!("Starting warden...");

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    info!(
        env = ?config.app.env,
        database = %config.database.url,
        "Configuration loaded"
    );

    // Database: pool + schema + repository
    let pool = warden_db::create_pool(&warden_db::pool::PoolConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .map_err(WardenError::database)?;
    warden_db::init_schema(&pool)
        .await
        .map_err(WardenError::database)?;
    let silences: Arc<dyn SilenceRepository> = Arc::new(SqliteSilenceRepository::new(pool.clone()));

    // REST collaborator
    let rest = Arc::new(RestClient::new(&config.discord).map_err(WardenError::external)?);

    // Register the silence command (idempotent upsert on the platform side)
    let registered = rest
        .register_command(&config.discord.app_id, &silence_command())
        .await
        .map_err(WardenError::external)?;
    info!(command_id = ?registered.id, "silence command registered");

    // Discover the gateway URL
    let gateway_url = rest
        .get_gateway_url()
        .await
        .map_err(WardenError::external)?;
    info!(url = %gateway_url, "gateway discovered");

    // Event routing and enforcement
    let registry = EnforcementRegistry::new();
    let router = EventRouter::new(
        silences,
        rest.clone(),
        rest.clone(),
        Arc::clone(&registry),
        config.silence.poll_interval,
    );

    // Gateway client
    let client = GatewayClient::new(
        GatewayConfig {
            discovery_url: gateway_url,
            token: config.discord.token.expose().to_string(),
            intents: warden_gateway::protocol::Intents::moderation(),
            gateway_version: config.discord.gateway_version,
            reconnect: ReconnectConfig {
                base_delay: config.reconnect.base_delay,
                max_delay: config.reconnect.max_delay,
                max_attempts: config.reconnect.max_attempts,
            },
        },
        router,
    );

    // Connectivity problems never kill the process; hand them to the
    // reconnect loop and let it grind.
    if let Err(e) = client.connect().await {
        warn!(error = %e, "initial connect failed, entering reconnect loop");
        client.request_reconnect();
    }

    // Run until the process is told to stop
    wait_for_shutdown().await;

    info!("shutting down");
    client.close().await;
    registry.shutdown();
    pool.close().await;
    info!("shutdown complete");

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
