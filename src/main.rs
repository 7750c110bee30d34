use anyhow::{Context, Result};
use roblox_bridge::api::{create_router, system_browser, BridgeAppState};
use roblox_bridge::config::{load_config, BridgeConfig};
use roblox_bridge::credentials::TokenManager;
use roblox_bridge::events::{BridgeEvent, EventBus};
use roblox_bridge::oauth::{run_state_cleanup, AuthFlow, OAuthClient, StateManager};
use roblox_bridge::upload::{run_operation_cleanup, AssetsClient, OperationStore, Uploader};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roblox_bridge=info".into()),
        )
        .init();

    info!("Roblox bridge starting...");

    // Read configuration from file (optional) and environment
    let mut config = match std::env::var("BRIDGE_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => BridgeConfig::default(),
    };
    config.apply_env();
    config.validate()?;

    info!(
        port = config.port,
        frontend_url = %config.frontend_url,
        redirect_uri = %config.roblox.redirect_uri,
        "Configuration loaded"
    );

    let events = EventBus::default();
    spawn_connection_observer(&events);

    // OAuth and credential lifecycle
    let oauth_client =
        OAuthClient::new(config.roblox.clone()).with_timeout(config.timeouts.oauth());
    let tokens = Arc::new(TokenManager::new(oauth_client.clone(), events.clone()));
    let states = StateManager::new(config.cleanup.state_ttl_seconds);
    let auth = Arc::new(AuthFlow::new(
        oauth_client,
        states.clone(),
        Arc::clone(&tokens),
        events.clone(),
    ));

    // Upload orchestration
    let operations = OperationStore::new(config.cleanup.operation_ttl_seconds);
    let uploader = Arc::new(Uploader::new(
        AssetsClient::new(config.roblox.clone()),
        Arc::clone(&tokens),
        operations.clone(),
        config.timeouts.clone(),
        events.clone(),
    ));

    tokio::spawn(run_state_cleanup(states, config.cleanup.interval_seconds));
    tokio::spawn(run_operation_cleanup(
        operations,
        config.cleanup.interval_seconds,
    ));

    // Start HTTP API server
    let router = create_router(BridgeAppState {
        auth,
        tokens,
        uploader,
        frontend_url: config.frontend_url.clone(),
        open_browser: system_browser,
    });

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}: port already in use, another instance may be running",
                addr
            )
        })?;
    info!(addr = %addr, "Bridge API listening");
    events.activity(format!("[Bridge] Listening on http://{}", addr));

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Bridge API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Roblox bridge stopped");

    Ok(())
}

/// Log connection changes and activity lines for whoever is watching the console
fn spawn_connection_observer(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(BridgeEvent::ConnectionChanged {
                    connected: true,
                    username,
                }) => {
                    info!(username = username.as_deref().unwrap_or("unknown"), "Connected to Roblox");
                }
                Ok(BridgeEvent::ConnectionChanged {
                    connected: false, ..
                }) => {
                    info!("Not connected to Roblox");
                }
                Ok(BridgeEvent::Activity { message }) => debug!("{}", message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event observer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
