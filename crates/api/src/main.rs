use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rollbook_core::memory::MemoryStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollbook_api::config::{ServerConfig, StorageBackend};
use rollbook_api::engine::Stores;
use rollbook_api::notifications::NotificationRouter;
use rollbook_api::router::build_app_router;
use rollbook_api::state::AppState;
use rollbook_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rollbook_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = config.storage.as_str(),
        "Loaded server configuration"
    );

    // --- Storage ---
    let (stores, pool) = match config.storage {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set");

            let pool = rollbook_db::create_pool(database_url, config.db_max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            rollbook_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            rollbook_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            (Stores::postgres(rollbook_db::PgStore::new(pool.clone())), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            (Stores::memory(Arc::new(MemoryStore::new())), None)
        }
    };

    // --- App state ---
    let state = AppState::new(config.clone(), stores, pool);

    // --- Background tasks ---
    let background_cancel = CancellationToken::new();
    let heartbeat_handle =
        ws::start_heartbeat(Arc::clone(&state.ws_manager), background_cancel.clone());

    let notification_router = NotificationRouter::new(
        Arc::clone(&state.engine),
        Arc::clone(&state.ws_manager),
        Arc::clone(&state.report_watches),
    );
    let router_handle = tokio::spawn(notification_router.run(state.event_bus.subscribe()));
    tracing::info!("Notification router started");

    let ws_manager = Arc::clone(&state.ws_manager);
    let report_watches = Arc::clone(&state.report_watches);

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let cleanup_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    report_watches.shutdown_all().await;

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    background_cancel.cancel();
    let _ = tokio::time::timeout(cleanup_timeout, heartbeat_handle).await;

    // The router holds the engine, which holds the bus sender, so the
    // broadcast channel never closes on its own here.
    router_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
