//! ClerkSync Web Server - Clerk webhook receiver.
//!
//! This binary:
//! - Receives Clerk webhooks on `POST /api/webhooks/clerk`
//! - Verifies the Svix signature and replay window
//! - Creates a local user for every `user.created` event
//!
//! Refuses to start without a signing secret.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clerksync::{app, AppState, Config, HttpUserStore, MemoryUserStore, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration; a missing secret is fatal
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        webhook_tolerance_secs = config.webhook_tolerance_secs,
        user_store_url = ?config.user_store_url,
        user_store_token_set = config.user_store_token.is_some(),
        user_store_timeout_ms = config.user_store_timeout_ms,
        "config_loaded"
    );

    let store: Arc<dyn UserStore> = match &config.user_store_url {
        Some(url) => Arc::new(
            HttpUserStore::new(url, config.user_store_token.clone(), config.user_store_timeout())
                .context("Failed to create user store client")?,
        ),
        None => {
            warn!("user_store_url_not_configured_using_memory_store");
            Arc::new(MemoryUserStore::new())
        }
    };

    // Build the router
    let state = AppState::new(&config, store);
    let app = app(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
