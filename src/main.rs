//! Portal notification server.
//!
//! Main entry point that wires the crates together and serves the
//! event-stream, push and statistics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use portal_api::{AppState, build_app};
use portal_auth::JwtAuthenticator;
use portal_core::config::AppConfig;
use portal_core::error::{AppError, ErrorKind};
use portal_core::traits::NotificationStore;
use portal_database::migration::run_migrations;
use portal_database::{DatabasePool, MemoryNotificationStore, NotificationRepository};
use portal_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let env = std::env::var("PORTAL_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting portal notification server v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.jwt_secret.is_empty() {
        return Err(AppError::configuration("auth.jwt_secret must be set"));
    }

    // ── Step 1: Notification store ───────────────────────────────
    let (store, db_pool) = init_store(&config).await?;

    // ── Step 2: Authentication ───────────────────────────────────
    let authenticator = Arc::new(JwtAuthenticator::new(&config.auth));

    // ── Step 3: Realtime engine + heartbeat ──────────────────────
    let engine = RealtimeEngine::new(&config.realtime);
    engine.start_heartbeat();

    // ── Step 4: Build and start HTTP server ──────────────────────
    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, engine.clone(), authenticator, store);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e))?;

    tracing::info!(addr = %addr, "Portal notification server listening");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    // Open event streams never finish on their own, so the engine closes
    // every channel as soon as the signal arrives.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_engine = engine.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        shutdown_engine.shutdown().await;
        let _ = shutdown_tx.send(true);
    });

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = async {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, forcing shutdown");
        }
    }

    // ── Step 6: Release resources ────────────────────────────────
    if let Some(pool) = db_pool {
        pool.close().await;
    }

    tracing::info!("Portal notification server shut down gracefully");
    Ok(())
}

/// Selects the notification store: PostgreSQL when a URL is configured,
/// otherwise an in-memory store.
async fn init_store(
    config: &AppConfig,
) -> Result<(Arc<dyn NotificationStore>, Option<DatabasePool>), AppError> {
    if !config.database.is_configured() {
        tracing::warn!("No database URL configured, notifications are kept in memory");
        return Ok((Arc::new(MemoryNotificationStore::new()), None));
    }

    let pool = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        run_migrations(pool.pool()).await?;
    }
    let repository = NotificationRepository::new(pool.pool().clone());
    Ok((Arc::new(repository), Some(pool)))
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
